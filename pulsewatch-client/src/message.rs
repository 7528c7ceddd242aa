//! Wire types for the push channel.
//!
//! These match the newline-delimited JSON frames exchanged with the backend
//! stream endpoint. Inbound frames are treated generically, keyed by
//! `type`; the only frame the client sends outward is the heartbeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenant::TenantSelection;

/// One inbound frame from the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Message kind, e.g. "event" or "heartbeat".
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-specific body, kept opaque.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// When the underlying event occurred. Absent for control frames and
    /// for events the backend could not timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,

    /// Tenant that produced the event, if scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl StreamMessage {
    /// The tenant identifier carried by this message, either at the top
    /// level or inside the payload.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant
            .as_deref()
            .or_else(|| self.payload.get("tenant").and_then(|v| v.as_str()))
    }
}

/// The outbound liveness ping.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    tenant: String,
}

impl HeartbeatFrame {
    /// Build a heartbeat scoped to the active tenant.
    pub fn new(tenant: &TenantSelection) -> Self {
        Self {
            kind: "heartbeat",
            tenant: tenant.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_event() {
        let json = r#"{
            "type": "event",
            "payload": {"id": "ev-1", "severity": "critical"},
            "occurred_at": "2026-03-09T10:07:30Z",
            "tenant": "acme"
        }"#;

        let msg: StreamMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, "event");
        assert_eq!(msg.tenant_id(), Some("acme"));
        assert!(msg.occurred_at.is_some());
        assert_eq!(msg.payload["severity"], "critical");
    }

    #[test]
    fn deserialize_without_timestamp_or_tenant() {
        let json = r#"{"type": "heartbeat", "payload": {}}"#;
        let msg: StreamMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, "heartbeat");
        assert!(msg.occurred_at.is_none());
        assert!(msg.tenant_id().is_none());
    }

    #[test]
    fn tenant_falls_back_to_payload() {
        let json = r#"{"type": "event", "payload": {"tenant": "globex"}}"#;
        let msg: StreamMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.tenant_id(), Some("globex"));
    }

    #[test]
    fn offset_timestamps_convert_to_utc() {
        let json = r#"{"type": "event", "payload": {}, "occurred_at": "2026-03-09T12:07:30+02:00"}"#;
        let msg: StreamMessage = serde_json::from_str(json).unwrap();
        let expected: DateTime<Utc> = "2026-03-09T10:07:30Z".parse().unwrap();
        assert_eq!(msg.occurred_at, Some(expected));
    }

    #[test]
    fn heartbeat_frame_carries_tenant_label() {
        let frame = HeartbeatFrame::new(&TenantSelection::All);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["tenant"], "all");

        let frame = HeartbeatFrame::new(&TenantSelection::Only("acme".into()));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["tenant"], "acme");
    }
}
