//! Status aggregation: snapshots in, summaries and notices out.
//!
//! The [`StatusAggregator`] is the single subscriber of the `status` tag. Each
//! inbound [`StatusSnapshot`] fully replaces the previous one; from it the
//! aggregator derives a [`HealthSummary`], raises deduplicated critical
//! alerts, announces maintenance windows, and warns on resource thresholds.
//! Consumers observe the latest snapshot through a watch channel and side
//! effects through the shared [`Notice`] broadcast.

use std::sync::Arc;
use std::time::{Duration, Instant};

use attic_core::alerts::{AlertSuppression, Notice, ResourceKind, failure_signature};
use attic_core::envelope::tags;
use attic_core::health::StatusSnapshot;
use attic_core::summary::HealthSummary;
use attic_settings::types::ConsoleSettings;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatcher, Subscription};

/// Folds status snapshots into summarized health state and notices.
pub struct StatusAggregator {
    settings: Arc<ConsoleSettings>,
    notices: broadcast::Sender<Notice>,
    snapshot: watch::Sender<Option<StatusSnapshot>>,
    suppression: Mutex<AlertSuppression>,
}

impl StatusAggregator {
    /// Create an aggregator with no snapshot yet.
    #[must_use]
    pub fn new(settings: Arc<ConsoleSettings>, notices: broadcast::Sender<Notice>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            settings,
            notices,
            snapshot,
            suppression: Mutex::new(AlertSuppression::default()),
        }
    }

    /// Subscribe this aggregator to the `status` tag of `dispatcher`.
    ///
    /// Dropping the returned [`Subscription`] detaches it again.
    pub fn attach(self: &Arc<Self>, dispatcher: &Arc<Dispatcher>) -> Subscription {
        let aggregator = Arc::clone(self);
        dispatcher.subscribe(tags::STATUS, move |data| aggregator.ingest(data))
    }

    /// Parse and apply a raw `status` payload. Malformed payloads are logged
    /// and dropped; the previous snapshot stays current.
    pub fn ingest(&self, data: &Value) {
        match serde_json::from_value::<StatusSnapshot>(data.clone()) {
            Ok(snapshot) => self.apply(snapshot),
            Err(e) => warn!(error = %e, "dropping malformed status snapshot"),
        }
    }

    /// Apply a parsed snapshot: derive the summary, run the alert checks,
    /// and publish it as the latest state.
    pub fn apply(&self, snapshot: StatusSnapshot) {
        self.apply_at(snapshot, Instant::now());
    }

    fn apply_at(&self, snapshot: StatusSnapshot, now: Instant) {
        let summary = HealthSummary::derive(&snapshot);
        debug!(
            overall = ?summary.overall,
            services = summary.total_services,
            errors = summary.error_services,
            "status snapshot applied"
        );

        self.check_critical(&snapshot, now);
        self.check_maintenance(&snapshot);
        self.check_resources(&snapshot);

        let _ = self.snapshot.send_replace(Some(snapshot));
    }

    /// The most recent snapshot, if any has arrived.
    #[must_use]
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Summary of the latest snapshot. Before the first snapshot this is the
    /// summary of an empty platform: healthy, zero services.
    #[must_use]
    pub fn summary(&self) -> HealthSummary {
        match self.snapshot.borrow().as_ref() {
            Some(snapshot) => HealthSummary::derive(snapshot),
            None => HealthSummary::derive(&StatusSnapshot::default()),
        }
    }

    /// A receiver tracking the latest published snapshot. Watch semantics:
    /// a slow reader sees the most recent value, not every intermediate one.
    #[must_use]
    pub fn watch_snapshots(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.snapshot.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Alert checks
    // ─────────────────────────────────────────────────────────────────────

    fn check_critical(&self, snapshot: &StatusSnapshot, now: Instant) {
        let failures = snapshot.critical_failures();
        let mut suppression = self.suppression.lock();

        if failures.is_empty() {
            // One-shot recovery notice, only after a remembered failure.
            if suppression.remembers_failure() {
                suppression.clear_signature();
                info!("critical services recovered");
                let _ = self.notices.send(Notice::ServicesRecovered);
            }
            return;
        }

        let signature = failure_signature(&failures);
        let cooldown = Duration::from_secs(self.settings.realtime.alert_cooldown_secs);
        if !suppression.should_alert(&signature, now, cooldown) {
            debug!(%signature, "critical alert suppressed within cooldown");
            return;
        }

        let names: Vec<String> = failures.iter().map(|s| s.name.clone()).collect();
        let details: Vec<String> = failures.iter().map(|s| s.message.clone()).collect();
        warn!(services = ?names, %signature, "critical services failing");
        suppression.record(signature, now);
        counter!(crate::metrics::ALERTS_TOTAL).increment(1);
        let _ = self.notices.send(Notice::CriticalServices { names, details });
    }

    // Maintenance is announced only when the platform supplied an operator
    // message; a bare flag with nothing to show is not actionable.
    fn check_maintenance(&self, snapshot: &StatusSnapshot) {
        if !snapshot.maintenance_mode {
            return;
        }
        if let Some(message) = &snapshot.maintenance_message {
            let _ = self.notices.send(Notice::Maintenance {
                message: message.clone(),
                eta: snapshot.maintenance_eta.clone(),
            });
        }
    }

    fn check_resources(&self, snapshot: &StatusSnapshot) {
        let Some(resources) = &snapshot.resources else {
            return;
        };
        let thresholds = &self.settings.thresholds;
        let checks = [
            (ResourceKind::Cpu, resources.cpu_percent, thresholds.cpu_percent),
            (
                ResourceKind::Memory,
                resources.memory_percent,
                thresholds.memory_percent,
            ),
            (
                ResourceKind::Disk,
                resources.disk_percent,
                thresholds.disk_percent,
            ),
        ];
        for (resource, percent, threshold) in checks {
            if percent > threshold {
                warn!(?resource, percent, threshold, "resource over threshold");
                let _ = self.notices.send(Notice::ResourceWarning {
                    resource,
                    percent,
                    threshold,
                });
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
