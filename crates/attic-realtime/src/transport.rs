//! The persistent WebSocket connection and its recovery loop.
//!
//! [`Transport`] owns at most one live connection at a time. Inbound text
//! frames are parsed into envelopes and handed to the [`Dispatcher`];
//! malformed frames are counted and dropped without disturbing the
//! connection. When the connection closes unexpectedly and auto-retry is
//! enabled, reconnection is scheduled with linearly growing delay until the
//! configured budget is spent, at which point a [`Notice::ReconnectFailed`]
//! asks the operator to intervene.
//!
//! Every state transition is guarded by a generation counter: `disconnect`
//! and each new dial bump it, so close handlers and sleeping retry tasks
//! from an earlier connection become no-ops instead of racing the current
//! one.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use attic_core::alerts::Notice;
use attic_core::envelope::Envelope;
use attic_settings::types::ConsoleSettings;
use futures::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;

/// Pause between the close and the fresh dial of a manual reconnect, so the
/// server observes the close before the new handshake arrives.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Cloneable handle to the shared connection state.
#[derive(Clone)]
pub struct Transport {
    shared: Arc<Shared>,
}

struct Shared {
    settings: Arc<ConsoleSettings>,
    client_id: String,
    dispatcher: Arc<Dispatcher>,
    notices: broadcast::Sender<Notice>,
    connected: watch::Sender<bool>,
    auto_retry: AtomicBool,
    inner: Mutex<Inner>,
}

/// Mutable connection state. `generation` increments on every dial and on
/// `disconnect`; tasks carry the generation they were spawned under and
/// bail out when it no longer matches.
#[derive(Default)]
struct Inner {
    generation: u64,
    attempts: u32,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reader: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl Transport {
    /// Create a disconnected transport.
    ///
    /// A fresh client id (UUIDv7) is minted and appended to the configured
    /// endpoint path for the lifetime of this transport. Auto-retry starts
    /// enabled.
    #[must_use]
    pub fn new(
        settings: Arc<ConsoleSettings>,
        dispatcher: Arc<Dispatcher>,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        let (connected, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                settings,
                client_id: Uuid::now_v7().to_string(),
                dispatcher,
                notices,
                connected,
                auto_retry: AtomicBool::new(true),
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// The client id this transport identifies itself with.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.shared.client_id
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// A receiver that observes connectivity edges (false → true and back).
    /// Repeated closes without an intervening open do not wake watchers.
    #[must_use]
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }

    /// Retry attempts consumed since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().attempts
    }

    /// Whether automatic reconnection is enabled.
    #[must_use]
    pub fn auto_retry(&self) -> bool {
        self.shared.auto_retry.load(Ordering::SeqCst)
    }

    /// Enable or disable automatic reconnection. Disabling does not cancel
    /// a retry that is already sleeping; use [`Transport::disconnect`] for
    /// that.
    pub fn set_auto_retry(&self, enabled: bool) {
        self.shared.auto_retry.store(enabled, Ordering::SeqCst);
    }

    /// Open the connection. A no-op when already connected; on failure the
    /// normal retry schedule takes over.
    pub async fn connect(&self) {
        if self.is_connected() {
            debug!("connect requested while already connected");
            return;
        }
        self.dial(None).await;
    }

    /// Drop the current connection and start over with a fresh retry
    /// budget, after a short pause for the close to land.
    pub async fn reconnect(&self) {
        self.disconnect();
        tokio::time::sleep(RECONNECT_PAUSE).await;
        self.dial(None).await;
    }

    /// Close the connection and cancel any pending retry.
    ///
    /// Resets the retry budget; a later [`Transport::connect`] starts
    /// from attempt zero.
    pub fn disconnect(&self) {
        {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            inner.attempts = 0;
            if let Some(retry) = inner.retry.take() {
                retry.abort();
            }
            if let Some(tx) = inner.outbound.take() {
                // Dropping the sender ends the connection task after the
                // close frame is written.
                let _ = tx.send(Message::Close(None));
            }
            inner.reader = None;
        }
        if self.set_connected(false) {
            counter!(crate::metrics::DISCONNECTIONS_TOTAL).increment(1);
            info!("realtime connection closed");
        }
    }

    /// Serialize `message` as JSON and queue it for the server.
    ///
    /// Dropped (and counted) when no connection is open; realtime traffic
    /// is not worth buffering across an outage.
    pub fn send<T: Serialize>(&self, message: &T) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound message");
                return;
            }
        };
        let inner = self.shared.inner.lock();
        let delivered = inner
            .outbound
            .as_ref()
            .is_some_and(|tx| tx.send(Message::text(payload)).is_ok());
        if !delivered {
            counter!(crate::metrics::SEND_DROPPED_TOTAL).increment(1);
            debug!("outbound message dropped while disconnected");
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Open a connection under a new generation.
    ///
    /// `scheduled` carries the generation a retry task was scheduled under;
    /// the dial is abandoned when it no longer matches, so a `disconnect`
    /// that lands while the retry is sleeping (or between its wake-up and
    /// this check) stays disconnected. Manual dials pass `None`.
    async fn dial(&self, scheduled: Option<u64>) {
        let (endpoint, generation) = {
            let mut inner = self.shared.inner.lock();
            match scheduled {
                Some(scheduled) => {
                    if inner.generation != scheduled {
                        debug!("scheduled retry superseded, abandoning dial");
                        return;
                    }
                    // This call is the scheduled retry itself; forget the
                    // handle without aborting it.
                    inner.retry = None;
                }
                None => {
                    if let Some(retry) = inner.retry.take() {
                        retry.abort();
                    }
                }
            }
            if let Some(reader) = inner.reader.take() {
                reader.abort();
            }
            inner.outbound = None;
            inner.generation += 1;
            (
                self.shared.settings.server.endpoint(&self.shared.client_id),
                inner.generation,
            )
        };
        debug!(%endpoint, "connecting");
        match connect_async(endpoint.as_str()).await {
            Ok((stream, _response)) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let transport = self.clone();
                let reader =
                    tokio::spawn(async move { transport.run_connection(stream, rx, generation).await });
                {
                    let mut inner = self.shared.inner.lock();
                    if inner.generation != generation {
                        // A disconnect or newer dial won the race.
                        reader.abort();
                        return;
                    }
                    inner.attempts = 0;
                    inner.outbound = Some(tx);
                    inner.reader = Some(reader);
                }
                counter!(crate::metrics::CONNECTIONS_TOTAL).increment(1);
                let _ = self.set_connected(true);
                info!(client_id = %self.shared.client_id, "realtime connection established");
            }
            Err(e) => {
                warn!(error = %e, %endpoint, "realtime connection failed");
                self.handle_closed(generation);
            }
        }
    }

    /// Type-erased [`Transport::dial`] so the retry task's future does not
    /// recursively contain itself.
    fn dial_boxed(&self, scheduled: u64) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        let transport = self.clone();
        Box::pin(async move { transport.dial(Some(scheduled)).await })
    }

    async fn run_connection(
        self,
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        mut outbound: mpsc::UnboundedReceiver<Message>,
        generation: u64,
    ) {
        let (mut sink, mut source) = stream.split();
        loop {
            tokio::select! {
                queued = outbound.recv() => match queued {
                    Some(message) => {
                        let closing = matches!(message, Message::Close(_));
                        if let Err(e) = sink.send(message).await {
                            warn!(error = %e, "outbound send failed");
                            break;
                        }
                        if closing {
                            break;
                        }
                    }
                    None => break,
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(raw))) => self.handle_frame(raw.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime stream error");
                        break;
                    }
                },
            }
        }
        self.handle_closed(generation);
    }

    fn handle_frame(&self, raw: &str) {
        match Envelope::parse(raw) {
            Ok(envelope) => {
                counter!(crate::metrics::FRAMES_TOTAL).increment(1);
                self.shared.dispatcher.dispatch(&envelope);
            }
            Err(e) => {
                counter!(crate::metrics::FRAME_PARSE_ERRORS_TOTAL).increment(1);
                warn!(error = %e, "dropping malformed frame");
            }
        }
    }

    /// React to a connection closing under generation `generation`.
    ///
    /// Stale generations (a disconnect or newer dial already happened) are
    /// ignored. Otherwise this either schedules the next retry or, with the
    /// budget spent, raises [`Notice::ReconnectFailed`].
    fn handle_closed(&self, generation: u64) {
        let mut inner = self.shared.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.outbound = None;
        inner.reader = None;
        if self.set_connected(false) {
            counter!(crate::metrics::DISCONNECTIONS_TOTAL).increment(1);
            info!("realtime connection lost");
        }
        if !self.auto_retry() {
            debug!("auto-retry disabled, staying disconnected");
            return;
        }
        let max_attempts = self.shared.settings.realtime.max_reconnect_attempts;
        if inner.attempts >= max_attempts {
            warn!(attempts = inner.attempts, "reconnect budget exhausted");
            let _ = self.shared.notices.send(Notice::ReconnectFailed);
            return;
        }
        // The first retry is immediate; each later one waits one base delay
        // longer than the previous.
        let delay_ms = self
            .shared
            .settings
            .realtime
            .base_retry_delay_ms
            .saturating_mul(u64::from(inner.attempts));
        inner.attempts += 1;
        let attempt = inner.attempts;
        let _ = self.shared.notices.send(Notice::Reconnecting {
            attempt,
            max_attempts,
        });
        info!(attempt, max_attempts, delay_ms, "scheduling reconnect");
        let transport = self.clone();
        inner.retry = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // The generation is re-validated inside dial, under the same
            // lock that would admit a competing disconnect.
            transport.dial_boxed(generation).await;
        }));
    }

    /// Set the connectivity flag, returning whether it changed. Watchers
    /// are only woken on edges.
    fn set_connected(&self, connected: bool) -> bool {
        self.shared.connected.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        let (notices, _) = broadcast::channel(16);
        Transport::new(
            Arc::new(ConsoleSettings::default()),
            Arc::new(Dispatcher::new()),
            notices,
        )
    }

    #[test]
    fn starts_disconnected_with_auto_retry() {
        let transport = transport();
        assert!(!transport.is_connected());
        assert!(transport.auto_retry());
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[test]
    fn client_id_is_stable_across_clones() {
        let transport = transport();
        let clone = transport.clone();
        assert_eq!(transport.client_id(), clone.client_id());
    }

    #[tokio::test]
    async fn send_while_disconnected_is_a_silent_drop() {
        let transport = transport();
        transport.send(&serde_json::json!({"type": "ping"}));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_harmless() {
        let transport = transport();
        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[test]
    fn auto_retry_toggle_round_trips() {
        let transport = transport();
        transport.set_auto_retry(false);
        assert!(!transport.auto_retry());
        transport.set_auto_retry(true);
        assert!(transport.auto_retry());
    }

    #[tokio::test]
    async fn malformed_frames_do_not_reach_subscribers() {
        let transport = transport();
        let dispatcher = Arc::clone(&transport.shared.dispatcher);
        let seen = Arc::new(Mutex::new(0_u32));
        let count = Arc::clone(&seen);
        let _sub = dispatcher.subscribe("log", move |_| *count.lock() += 1);

        transport.handle_frame("not json");
        transport.handle_frame(r#"{"data": {}}"#);
        transport.handle_frame(r#"{"type": "log", "data": {"line": "ok"}}"#);

        assert_eq!(*seen.lock(), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_raises_reconnect_failed() {
        let (notices, mut rx) = broadcast::channel(16);
        let settings = Arc::new(ConsoleSettings::default());
        let transport = Transport::new(settings, Arc::new(Dispatcher::new()), notices);

        let generation = {
            let mut inner = transport.shared.inner.lock();
            inner.attempts = transport.shared.settings.realtime.max_reconnect_attempts;
            inner.generation
        };
        transport.handle_closed(generation);

        assert_eq!(rx.try_recv(), Ok(Notice::ReconnectFailed));
    }

    #[tokio::test]
    async fn stale_generation_close_is_ignored() {
        let (notices, mut rx) = broadcast::channel(16);
        let transport = Transport::new(
            Arc::new(ConsoleSettings::default()),
            Arc::new(Dispatcher::new()),
            notices,
        );
        transport.disconnect(); // bumps the generation to 1
        transport.handle_closed(0);
        assert!(rx.try_recv().is_err());
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn superseded_retry_does_not_redial_after_disconnect() {
        let transport = transport();
        let scheduled = transport.shared.inner.lock().generation;
        // A manual disconnect lands after the retry was scheduled but
        // before it dials.
        transport.disconnect();

        transport.dial(Some(scheduled)).await;

        assert!(!transport.is_connected());
        // The abandoned dial must not start a new generation either.
        assert_eq!(transport.shared.inner.lock().generation, scheduled + 1);
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn close_schedules_linear_retry_and_notifies() {
        let (notices, mut rx) = broadcast::channel(16);
        let transport = Transport::new(
            Arc::new(ConsoleSettings::default()),
            Arc::new(Dispatcher::new()),
            notices,
        );

        let generation = transport.shared.inner.lock().generation;
        transport.handle_closed(generation);

        assert_eq!(transport.reconnect_attempts(), 1);
        assert_eq!(
            rx.try_recv(),
            Ok(Notice::Reconnecting {
                attempt: 1,
                max_attempts: 5
            })
        );
        // Cancel the spawned retry so the test ends cleanly.
        transport.disconnect();
    }
}
