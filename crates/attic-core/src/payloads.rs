//! Typed payload shapes for the non-status event tags.
//!
//! The dispatcher delivers opaque [`serde_json::Value`] payloads; these are
//! the documented shapes consumers deserialize into. The `status` tag's
//! payload lives in [`crate::health`].

use serde::{Deserialize, Serialize};

/// Payload of the `log` tag — one server log line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogLine {
    /// Log level (`debug`, `info`, `warning`, `error`).
    pub level: String,
    /// Emitting component.
    pub source: String,
    /// Log message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Payload of the `task_progress` tag — archival/download task progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskProgress {
    /// Task identifier.
    pub task_id: String,
    /// Human-readable task label.
    pub label: String,
    /// Task state (`queued`, `running`, `completed`, `failed`).
    pub state: String,
    /// Items processed so far.
    pub current: u64,
    /// Total items, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Payload of the `chat_message` tag — a message relayed from an archived
/// conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: String,
    /// Conversation the message belongs to.
    pub conversation_id: String,
    /// Sender display name.
    pub sender: String,
    /// Message body.
    pub body: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Payload of the `notification` tag — a platform notification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformNotification {
    /// Notification identifier.
    pub id: String,
    /// Severity (`info`, `warning`, `error`).
    pub severity: String,
    /// Short title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
