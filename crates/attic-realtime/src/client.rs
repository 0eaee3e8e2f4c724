//! The realtime context object.
//!
//! [`RealtimeClient`] owns the whole pipeline for one process: the settings,
//! the dispatcher, the single transport, and the status aggregator already
//! attached to the `status` tag. Construct one at application start and
//! inject it into consumers; dropping it (or calling
//! [`RealtimeClient::shutdown`]) closes the connection and cancels any
//! pending retry. There are no globals; the "exactly one connection per
//! process" invariant holds because the application constructs exactly one
//! client.

use std::sync::Arc;
use std::time::Duration;

use attic_core::alerts::Notice;
use attic_core::envelope::tags;
use attic_core::health::{ResourceMetrics, ServiceRecord, StatusSnapshot};
use attic_core::payloads::{ChatMessage, LogLine, PlatformNotification, TaskProgress};
use attic_core::summary::HealthSummary;
use attic_settings::types::ConsoleSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::bindings::StatusBinding;
use crate::dispatch::{Dispatcher, Subscription};
use crate::status::StatusAggregator;
use crate::transport::Transport;

/// Capacity of the notice broadcast. Slow consumers lag rather than block
/// the pipeline.
const NOTICE_CAPACITY: usize = 64;

/// Owns the realtime pipeline: transport, dispatcher, aggregator.
pub struct RealtimeClient {
    settings: Arc<ConsoleSettings>,
    dispatcher: Arc<Dispatcher>,
    transport: Transport,
    aggregator: Arc<StatusAggregator>,
    notices: broadcast::Sender<Notice>,
    _status_subscription: Subscription,
}

impl RealtimeClient {
    /// Build a disconnected client from explicit settings.
    #[must_use]
    pub fn new(settings: ConsoleSettings) -> Self {
        let settings = Arc::new(settings);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let dispatcher = Arc::new(Dispatcher::new());
        let transport = Transport::new(
            Arc::clone(&settings),
            Arc::clone(&dispatcher),
            notices.clone(),
        );
        let aggregator = Arc::new(StatusAggregator::new(
            Arc::clone(&settings),
            notices.clone(),
        ));
        let status_subscription = aggregator.attach(&dispatcher);
        Self {
            settings,
            dispatcher,
            transport,
            aggregator,
            notices,
            _status_subscription: status_subscription,
        }
    }

    /// Build a client from the settings file and `ATTIC_*` environment.
    #[must_use]
    pub fn from_settings_file() -> Self {
        Self::new(attic_settings::loader::load_settings())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection control
    // ─────────────────────────────────────────────────────────────────────

    /// Open the connection. A no-op when already connected.
    pub async fn connect(&self) {
        self.transport.connect().await;
    }

    /// Close the connection and cancel any pending retry.
    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    /// Manual reconnect: close, pause briefly, dial with a fresh budget.
    pub async fn reconnect(&self) {
        self.transport.reconnect().await;
    }

    /// Tear the pipeline down at application exit.
    pub fn shutdown(&self) {
        self.transport.disconnect();
    }

    /// Whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether a lost connection schedules retries.
    #[must_use]
    pub fn auto_retry(&self) -> bool {
        self.transport.auto_retry()
    }

    /// Enable or disable automatic reconnection.
    pub fn set_auto_retry(&self, enabled: bool) {
        self.transport.set_auto_retry(enabled);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Messaging
    // ─────────────────────────────────────────────────────────────────────

    /// Queue a caller-shaped message for the server; dropped when
    /// disconnected.
    pub fn send<T: Serialize>(&self, message: &T) {
        self.transport.send(message);
    }

    /// Register a raw callback for every envelope carrying `tag`.
    pub fn subscribe(
        &self,
        tag: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatcher.subscribe(tag, callback)
    }

    /// Typed subscription to `log` events.
    pub fn on_log(&self, callback: impl Fn(LogLine) + Send + Sync + 'static) -> Subscription {
        self.subscribe_typed(tags::LOG, callback)
    }

    /// Typed subscription to `task_progress` events.
    pub fn on_task_progress(
        &self,
        callback: impl Fn(TaskProgress) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_typed(tags::TASK_PROGRESS, callback)
    }

    /// Typed subscription to `chat_message` events.
    pub fn on_chat_message(
        &self,
        callback: impl Fn(ChatMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_typed(tags::CHAT_MESSAGE, callback)
    }

    /// Typed subscription to `notification` events.
    pub fn on_notification(
        &self,
        callback: impl Fn(PlatformNotification) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_typed(tags::NOTIFICATION, callback)
    }

    // Payloads that fail to deserialize are logged and skipped; the raw
    // subscription stays alive.
    fn subscribe_typed<T: DeserializeOwned>(
        &self,
        tag: &'static str,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatcher.subscribe(tag, move |data| {
            match serde_json::from_value::<T>(data.clone()) {
                Ok(payload) => callback(payload),
                Err(e) => warn!(%tag, error = %e, "dropping malformed payload"),
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status reads
    // ─────────────────────────────────────────────────────────────────────

    /// The latest status snapshot, if any has arrived.
    #[must_use]
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.aggregator.latest()
    }

    /// Health summary of the latest snapshot.
    #[must_use]
    pub fn summary(&self) -> HealthSummary {
        self.aggregator.summary()
    }

    /// Look up a single service in the latest snapshot.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<ServiceRecord> {
        self.aggregator
            .latest()
            .and_then(|snapshot| snapshot.service(name).cloned())
    }

    /// Resource metrics from the latest snapshot, if reported.
    #[must_use]
    pub fn resources(&self) -> Option<ResourceMetrics> {
        self.aggregator.latest().and_then(|snapshot| snapshot.resources)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Wiring
    // ─────────────────────────────────────────────────────────────────────

    /// A fresh receiver for alert and lifecycle notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Activate a binding: one status observer plus the edge-triggered
    /// connectivity poll, interval per settings. Must be called from within
    /// a tokio runtime.
    #[must_use]
    pub fn bind(&self) -> StatusBinding {
        StatusBinding::activate(
            self.transport.clone(),
            Arc::clone(&self.aggregator),
            Duration::from_millis(self.settings.realtime.poll_interval_ms),
        )
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn settings(&self) -> &Arc<ConsoleSettings> {
        &self.settings
    }

    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The underlying transport handle.
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The status aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &Arc<StatusAggregator> {
        &self.aggregator
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        // The reader task holds its own Transport clone; without an explicit
        // close it would keep the connection alive past the client.
        self.transport.disconnect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use attic_core::envelope::Envelope;
    use attic_core::health::{ServicePriority, ServiceStatus};
    use parking_lot::Mutex;
    use serde_json::json;

    fn client() -> RealtimeClient {
        let client = RealtimeClient::new(ConsoleSettings::default());
        client.set_auto_retry(false);
        client
    }

    fn status_envelope() -> Envelope {
        let mut snap = StatusSnapshot::default();
        let _ = snap.services.insert(
            "db".to_string(),
            ServiceRecord {
                name: "db".to_string(),
                status: ServiceStatus::Healthy,
                priority: ServicePriority::Critical,
                health_score: 1.0,
                ..ServiceRecord::default()
            },
        );
        Envelope::new(tags::STATUS, serde_json::to_value(snap).unwrap())
    }

    #[test]
    fn status_envelopes_flow_into_the_aggregator() {
        let client = client();
        client.dispatcher().dispatch(&status_envelope());

        assert!(client.snapshot().is_some());
        assert_eq!(client.summary().total_services, 1);
        assert_eq!(
            client.service("db").map(|s| s.status),
            Some(ServiceStatus::Healthy)
        );
        assert!(client.resources().is_none());
    }

    #[test]
    fn typed_log_subscription_parses_payloads() {
        let client = client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = client.on_log(move |line: LogLine| sink.lock().push(line.message));

        client.dispatcher().dispatch(&Envelope::new(
            tags::LOG,
            json!({"level": "info", "message": "archived 12 items", "timestamp": "2026-08-23T10:00:00Z"}),
        ));
        // Malformed payload is skipped, not fatal.
        client
            .dispatcher()
            .dispatch(&Envelope::new(tags::LOG, json!("not an object")));

        assert_eq!(*seen.lock(), vec!["archived 12 items".to_string()]);
    }

    #[test]
    fn typed_task_progress_subscription() {
        let client = client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = client.on_task_progress(move |p: TaskProgress| sink.lock().push(p.task_id));

        client.dispatcher().dispatch(&Envelope::new(
            tags::TASK_PROGRESS,
            json!({"taskId": "t-1", "label": "export", "state": "running", "current": 3, "total": 10, "timestamp": ""}),
        ));
        assert_eq!(*seen.lock(), vec!["t-1".to_string()]);
    }

    #[test]
    fn before_first_snapshot_reads_are_empty() {
        let client = client();
        assert!(client.snapshot().is_none());
        assert!(client.service("db").is_none());
        assert!(client.resources().is_none());
        assert_eq!(client.summary().total_services, 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let client = client();
        client.shutdown();
        client.shutdown();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn notices_receiver_observes_alerts() {
        let client = client();
        let mut notices = client.notices();

        let mut snap = StatusSnapshot::default();
        let _ = snap.services.insert(
            "db".to_string(),
            ServiceRecord {
                name: "db".to_string(),
                status: ServiceStatus::Error,
                priority: ServicePriority::Critical,
                health_score: 0.0,
                message: "down".to_string(),
                ..ServiceRecord::default()
            },
        );
        client
            .dispatcher()
            .dispatch(&Envelope::new(tags::STATUS, serde_json::to_value(snap).unwrap()));

        assert_matches!(notices.try_recv(), Ok(Notice::CriticalServices { .. }));
    }
}
