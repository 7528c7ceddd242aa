//! Telemetry sink for health transition events.
//!
//! Delivery is strictly best-effort: a failed emission is logged at debug
//! level and swallowed, and never affects widget state.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use pulsewatch_types::TelemetryEvent;

/// One health transition report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    /// Which widget reported, e.g. "event_timeline".
    pub component: String,
    /// What happened.
    pub event: TelemetryEvent,
    /// The tenant scope at the time of the transition.
    pub tenant: String,
}

/// Destination for telemetry records.
#[derive(Debug)]
pub enum TelemetrySink {
    /// Drop every record.
    Disabled,

    /// POST records to an HTTP collector.
    Http {
        client: reqwest::Client,
        endpoint: String,
    },

    /// Forward records through a channel.
    ///
    /// Use `TelemetrySink::channel()` to create this variant and get the
    /// receiver.
    Channel(mpsc::Sender<TelemetryRecord>),
}

impl TelemetrySink {
    /// A sink that drops everything.
    pub fn disabled() -> Self {
        TelemetrySink::Disabled
    }

    /// A sink that POSTs each record to `endpoint`.
    pub fn http(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .expect("Failed to build HTTP client");
        TelemetrySink::Http {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// A sink forwarding into a channel, returned with its receiver.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<TelemetryRecord>) {
        let (tx, rx) = mpsc::channel(buffer);
        (TelemetrySink::Channel(tx), rx)
    }

    /// Emit one record, best effort.
    pub async fn emit(&self, record: TelemetryRecord) {
        match self {
            TelemetrySink::Disabled => {}
            TelemetrySink::Http { client, endpoint } => {
                if let Err(e) = client.post(endpoint).json(&record).send().await {
                    debug!("telemetry emission failed: {}", e);
                }
            }
            TelemetrySink::Channel(tx) => {
                // Best effort send (don't block if the channel is full)
                let _ = tx.try_send(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: TelemetryEvent) -> TelemetryRecord {
        TelemetryRecord {
            component: "event_timeline".to_string(),
            event,
            tenant: "all".to_string(),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_records() {
        let (sink, mut rx) = TelemetrySink::channel(4);
        sink.emit(record(TelemetryEvent::WsStale)).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, TelemetryEvent::WsStale);
        assert_eq!(received.tenant, "all");
    }

    #[tokio::test]
    async fn disabled_sink_swallows_records() {
        let sink = TelemetrySink::disabled();
        sink.emit(record(TelemetryEvent::Degraded)).await;
    }

    #[tokio::test]
    async fn full_channel_does_not_block() {
        let (sink, _rx) = TelemetrySink::channel(1);
        sink.emit(record(TelemetryEvent::WsStale)).await;
        // second emit hits a full buffer and is dropped
        sink.emit(record(TelemetryEvent::Recovered)).await;
    }

    #[test]
    fn record_serializes_with_wire_event_names() {
        let json = serde_json::to_value(record(TelemetryEvent::HttpRefreshFailed)).unwrap();
        assert_eq!(json["component"], "event_timeline");
        assert_eq!(json["event"], "http_refresh_failed");
        assert_eq!(json["tenant"], "all");
    }
}
