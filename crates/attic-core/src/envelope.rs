//! The [`Envelope`] struct — the unit of dispatch for inbound frames.
//!
//! Every frame received over the realtime connection parses into an envelope
//! with a string event-type tag and an opaque payload. The payload is kept as
//! [`serde_json::Value`] for exact wire compatibility; typed access is opt-in
//! via the shapes in [`crate::payloads`] and [`crate::health`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event-type tags multiplexed over the single realtime connection.
pub mod tags {
    /// Server log lines.
    pub const LOG: &str = "log";
    /// Archival/download task progress updates.
    pub const TASK_PROGRESS: &str = "task_progress";
    /// Full service-health snapshots.
    pub const STATUS: &str = "status";
    /// Chat messages relayed from archived conversations.
    pub const CHAT_MESSAGE: &str = "chat_message";
    /// Platform notifications.
    pub const NOTIFICATION: &str = "notification";
}

/// A parsed inbound frame.
///
/// Wire format: `{ "type": "<tag>", "data": <payload> }`. A missing `data`
/// field deserializes to [`Value::Null`]; a missing or non-string `type` is a
/// parse error and the transport drops the frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event-type tag this frame dispatches under.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque payload; shape depends on the tag.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Build an envelope from a tag and payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Parse a raw text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the frame is not a
    /// JSON object of the expected shape.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Current UTC time as an ISO 8601 string, the timestamp format carried on
/// all wire types.
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_well_formed_frame() {
        let env = Envelope::parse(r#"{"type":"log","data":{"message":"hi"}}"#).unwrap();
        assert_eq!(env.event_type, tags::LOG);
        assert_eq!(env.data["message"], "hi");
    }

    #[test]
    fn parse_missing_data_defaults_to_null() {
        let env = Envelope::parse(r#"{"type":"notification"}"#).unwrap();
        assert_eq!(env.event_type, tags::NOTIFICATION);
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn parse_missing_type_is_an_error() {
        assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn parse_non_object_is_an_error() {
        assert!(Envelope::parse("[1,2,3]").is_err());
        assert!(Envelope::parse("not json at all").is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_wire_names() {
        let env = Envelope::new(tags::STATUS, json!({"services": {}}));
        let raw = serde_json::to_string(&env).unwrap();
        assert!(raw.contains(r#""type":"status""#));
        let back = Envelope::parse(&raw).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn now_timestamp_is_iso8601() {
        let ts = now_timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
