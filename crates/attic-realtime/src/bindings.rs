//! Bridge from the imperative transport/aggregator world to declarative
//! consumers.
//!
//! A [`StatusBinding`] is one activation of the bridge: it registers a status
//! observer (a watch receiver on the aggregator) and runs a fixed-interval
//! connectivity poll whose output is edge-triggered, so downstream consumers
//! only wake when the connected flag actually changes, never on every tick.
//! Dropping the binding tears both down; repeated activate/drop cycles leak
//! nothing.

use std::sync::Arc;
use std::time::Duration;

use attic_core::health::StatusSnapshot;
use attic_core::summary::HealthSummary;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::status::StatusAggregator;
use crate::transport::Transport;

/// One live activation of the binding layer.
pub struct StatusBinding {
    transport: Transport,
    aggregator: Arc<StatusAggregator>,
    snapshots: watch::Receiver<Option<StatusSnapshot>>,
    connected: watch::Receiver<bool>,
    poll: JoinHandle<()>,
}

impl StatusBinding {
    /// Activate the binding.
    ///
    /// If the transport is not yet connected, one `connect()` is triggered in
    /// the background; if it is, nothing is dialed again. Must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn activate(
        transport: Transport,
        aggregator: Arc<StatusAggregator>,
        poll_interval: Duration,
    ) -> Self {
        if !transport.is_connected() {
            let dial = transport.clone();
            drop(tokio::spawn(async move { dial.connect().await }));
        }

        let snapshots = aggregator.watch_snapshots();
        let (connected_tx, connected) = watch::channel(transport.is_connected());
        let sampled = transport.clone();
        let poll = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                let _ = ticker.tick().await;
                let now_connected = sampled.is_connected();
                let changed = connected_tx.send_if_modified(|current| {
                    if *current == now_connected {
                        false
                    } else {
                        *current = now_connected;
                        true
                    }
                });
                if changed {
                    debug!(connected = now_connected, "connectivity edge");
                }
            }
        });

        Self {
            transport,
            aggregator,
            snapshots,
            connected,
            poll,
        }
    }

    /// The latest aggregated snapshot, if any has arrived.
    #[must_use]
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Summary of the latest snapshot.
    #[must_use]
    pub fn summary(&self) -> HealthSummary {
        self.aggregator.summary()
    }

    /// Connected flag as of the last poll tick.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// A receiver that wakes only on connectivity edges.
    #[must_use]
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// A receiver tracking the latest published snapshot. Watch semantics:
    /// a slow reader sees the most recent value, not every intermediate one.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.snapshots.clone()
    }

    /// The transport this binding observes.
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Tear the binding down. Equivalent to dropping it.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl Drop for StatusBinding {
    fn drop(&mut self) {
        self.poll.abort();
        debug!("status binding deactivated");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attic_core::health::{ServicePriority, ServiceRecord, ServiceStatus};
    use attic_settings::types::ConsoleSettings;
    use tokio::sync::broadcast;

    use crate::dispatch::Dispatcher;

    fn parts() -> (Transport, Arc<StatusAggregator>) {
        let settings = Arc::new(ConsoleSettings::default());
        let (notices, _) = broadcast::channel(16);
        let transport = Transport::new(
            Arc::clone(&settings),
            Arc::new(Dispatcher::new()),
            notices.clone(),
        );
        // The binding must not trigger a dial in these tests.
        transport.set_auto_retry(false);
        let aggregator = Arc::new(StatusAggregator::new(settings, notices));
        (transport, aggregator)
    }

    fn snapshot() -> StatusSnapshot {
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
        snap
    }

    #[tokio::test]
    async fn binding_exposes_aggregator_state() {
        let (transport, aggregator) = parts();
        let binding = StatusBinding::activate(
            transport,
            Arc::clone(&aggregator),
            Duration::from_millis(50),
        );

        assert!(binding.snapshot().is_none());
        aggregator.apply(snapshot());
        assert!(binding.snapshot().is_some());
        assert_eq!(binding.summary().total_services, 1);
    }

    #[tokio::test]
    async fn binding_starts_with_current_connectivity() {
        let (transport, aggregator) = parts();
        let binding =
            StatusBinding::activate(transport, aggregator, Duration::from_millis(50));
        assert!(!binding.is_connected());
    }

    #[tokio::test]
    async fn drop_stops_the_poll() {
        let (transport, aggregator) = parts();
        let binding =
            StatusBinding::activate(transport, aggregator, Duration::from_millis(50));
        let mut connectivity = binding.connectivity();
        drop(binding);

        // The sender side is gone once the poll task dies.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(connectivity.has_changed().is_err());
    }

    #[tokio::test]
    async fn repeated_activation_cycles_are_clean() {
        let (transport, aggregator) = parts();
        for _ in 0..3 {
            let binding = StatusBinding::activate(
                transport.clone(),
                Arc::clone(&aggregator),
                Duration::from_millis(50),
            );
            binding.deactivate();
        }
    }
}
