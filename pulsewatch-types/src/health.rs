//! Connection trust state for a live widget.

use chrono::{DateTime, Utc};

/// How much the currently displayed data can be trusted.
///
/// `Stale` is suspicion (the push channel went quiet); `Degraded` is
/// confirmation (the fallback refresh failed too). Recovery is an event,
/// not a state: anything that proves freshness resets to `Live`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ConnectionState {
    Live,
    Stale,
    Degraded,
}

impl ConnectionState {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            ConnectionState::Live => "LIVE",
            ConnectionState::Stale => "STALE",
            ConnectionState::Degraded => "DEGRADED",
        }
    }
}

/// Health of one widget's live channel, published alongside its timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionHealth {
    /// Current trust state.
    pub state: ConnectionState,

    /// When the last message arrived on the push channel. `None` until the
    /// first message: a channel that has not spoken yet is not stale.
    pub last_message_at: Option<DateTime<Utc>>,

    /// When the widget last recovered from a stale or degraded period.
    pub last_recovered_at: Option<DateTime<Utc>>,

    /// Why the widget is degraded, shown in the degradation banner.
    pub degraded_reason: Option<String>,
}

impl ConnectionHealth {
    /// Health at mount: optimistically live, nothing heard yet.
    pub fn initial() -> Self {
        Self {
            state: ConnectionState::Live,
            last_message_at: None,
            last_recovered_at: None,
            degraded_reason: None,
        }
    }

    /// True while the live channel is trusted.
    pub fn is_live(&self) -> bool {
        self.state == ConnectionState::Live
    }
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::initial()
    }
}

/// Health transition events reported to the telemetry sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TelemetryEvent {
    /// Live updates resumed after a stale or degraded period.
    Recovered,
    /// The push channel went quiet past the staleness threshold.
    WsStale,
    /// The fallback full refresh failed.
    HttpRefreshFailed,
    /// Staleness was confirmed; the degradation banner is up.
    Degraded,
}

impl TelemetryEvent {
    /// The event name carried on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TelemetryEvent::Recovered => "recovered",
            TelemetryEvent::WsStale => "ws_stale",
            TelemetryEvent::HttpRefreshFailed => "http_refresh_failed",
            TelemetryEvent::Degraded => "degraded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_health_is_optimistic() {
        let health = ConnectionHealth::initial();
        assert!(health.is_live());
        assert!(health.last_message_at.is_none());
        assert!(health.last_recovered_at.is_none());
        assert!(health.degraded_reason.is_none());
    }

    #[test]
    fn state_symbols() {
        assert_eq!(ConnectionState::Live.symbol(), "LIVE");
        assert_eq!(ConnectionState::Stale.symbol(), "STALE");
        assert_eq!(ConnectionState::Degraded.symbol(), "DEGRADED");
    }

    #[test]
    fn telemetry_wire_names() {
        assert_eq!(TelemetryEvent::Recovered.wire_name(), "recovered");
        assert_eq!(TelemetryEvent::WsStale.wire_name(), "ws_stale");
        assert_eq!(
            TelemetryEvent::HttpRefreshFailed.wire_name(),
            "http_refresh_failed"
        );
        assert_eq!(TelemetryEvent::Degraded.wire_name(), "degraded");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn telemetry_events_serialize_to_wire_names() {
        for event in [
            TelemetryEvent::Recovered,
            TelemetryEvent::WsStale,
            TelemetryEvent::HttpRefreshFailed,
            TelemetryEvent::Degraded,
        ] {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json, serde_json::Value::String(event.wire_name().into()));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn connection_state_serializes_upper_case() {
        let json = serde_json::to_value(ConnectionState::Degraded).unwrap();
        assert_eq!(json, serde_json::Value::String("DEGRADED".into()));
    }
}
