//! Alert notices and the dedup/cooldown suppression state.
//!
//! [`Notice`] is the side-effect event surfaced to UI code: critical-service
//! alerts, recovery, maintenance, resource warnings, and the transport's
//! reconnect lifecycle. [`AlertSuppression`] is the small value type that
//! gates critical alerts — a remembered signature of the failing set plus the
//! time of the last raised alert, advanced only by the aggregator.

use std::time::{Duration, Instant};

use crate::health::ServiceRecord;

/// A user-facing side effect raised by the realtime pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// One or more critical services are failing.
    CriticalServices {
        /// Names of the affected services, sorted.
        names: Vec<String>,
        /// Per-service status messages, aligned with `names`.
        details: Vec<String>,
    },
    /// All previously failing critical services have recovered.
    ServicesRecovered,
    /// The platform entered maintenance mode with an operator message.
    Maintenance {
        /// Operator-facing message.
        message: String,
        /// Estimated end of the window, if announced.
        eta: Option<String>,
    },
    /// A system resource crossed its warning threshold.
    ResourceWarning {
        /// Which resource.
        resource: ResourceKind,
        /// Observed utilisation percent.
        percent: f64,
        /// Configured threshold percent.
        threshold: f64,
    },
    /// The transport lost its connection and a retry is scheduled.
    Reconnecting {
        /// Retry attempt about to run (1-based).
        attempt: u32,
        /// Configured retry budget.
        max_attempts: u32,
    },
    /// The retry budget is exhausted; manual reconnect required.
    ReconnectFailed,
}

/// Resource dimension of a [`Notice::ResourceWarning`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// CPU utilisation.
    Cpu,
    /// Memory utilisation.
    Memory,
    /// Disk utilisation.
    Disk,
}

/// Canonical, order-independent signature of a critical-failure set.
///
/// Sorted by name, `name:status:score` tuples joined with `,`. Scores are
/// fixed to two decimals so the signature is stable across float formatting.
#[must_use]
pub fn failure_signature(failures: &[&ServiceRecord]) -> String {
    let mut parts: Vec<String> = failures
        .iter()
        .map(|s| format!("{}:{}:{:.2}", s.name, s.status.as_str(), s.health_score))
        .collect();
    parts.sort();
    parts.join(",")
}

/// Dedup and cooldown state for critical alerts.
///
/// A new alert is raised when the failing set's signature differs from the
/// remembered one, or when the cooldown window has elapsed since the last
/// alert — so an unchanged failure re-alerts once per cooldown window and a
/// changed failure alerts immediately. Recovery clears the remembered
/// signature (but not the alert clock).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlertSuppression {
    /// Signature of the critical-failure set at the last alert.
    pub last_signature: Option<String>,
    /// When the last critical alert was raised.
    pub last_alert_at: Option<Instant>,
}

impl AlertSuppression {
    /// Whether an alert for `signature` should fire at `now`.
    #[must_use]
    pub fn should_alert(&self, signature: &str, now: Instant, cooldown: Duration) -> bool {
        let changed = self.last_signature.as_deref() != Some(signature);
        let cooled = self
            .last_alert_at
            .is_none_or(|at| now.duration_since(at) > cooldown);
        changed || cooled
    }

    /// Record a raised alert.
    pub fn record(&mut self, signature: String, now: Instant) {
        self.last_signature = Some(signature);
        self.last_alert_at = Some(now);
    }

    /// Whether a critical-failure signature is currently remembered.
    #[must_use]
    pub fn remembers_failure(&self) -> bool {
        self.last_signature.is_some()
    }

    /// Clear the remembered signature after recovery.
    pub fn clear_signature(&mut self) {
        self.last_signature = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{ServicePriority, ServiceStatus};

    const COOLDOWN: Duration = Duration::from_secs(300);

    fn failing(name: &str, score: f64) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            status: ServiceStatus::Error,
            priority: ServicePriority::Critical,
            health_score: score,
            ..ServiceRecord::default()
        }
    }

    #[test]
    fn signature_is_order_independent() {
        let a = failing("db", 0.0);
        let b = failing("web", 0.25);
        assert_eq!(failure_signature(&[&a, &b]), failure_signature(&[&b, &a]));
        assert_eq!(failure_signature(&[&a, &b]), "db:error:0.00,web:error:0.25");
    }

    #[test]
    fn signature_changes_with_score() {
        let a = failing("db", 0.0);
        let b = failing("db", 0.5);
        assert_ne!(failure_signature(&[&a]), failure_signature(&[&b]));
    }

    #[test]
    fn first_alert_always_fires() {
        let state = AlertSuppression::default();
        assert!(state.should_alert("db:error:0.00", Instant::now(), COOLDOWN));
    }

    #[test]
    fn identical_signature_within_cooldown_is_suppressed() {
        let mut state = AlertSuppression::default();
        let t0 = Instant::now();
        state.record("db:error:0.00".into(), t0);
        assert!(!state.should_alert("db:error:0.00", t0 + Duration::from_secs(1), COOLDOWN));
    }

    #[test]
    fn identical_signature_after_cooldown_fires_again() {
        let mut state = AlertSuppression::default();
        let t0 = Instant::now();
        state.record("db:error:0.00".into(), t0);
        assert!(state.should_alert("db:error:0.00", t0 + Duration::from_secs(301), COOLDOWN));
    }

    #[test]
    fn changed_signature_fires_inside_cooldown() {
        let mut state = AlertSuppression::default();
        let t0 = Instant::now();
        state.record("db:error:0.00".into(), t0);
        assert!(state.should_alert("db:error:0.00,web:error:0.10", t0 + Duration::from_secs(1), COOLDOWN));
    }

    #[test]
    fn clear_signature_keeps_alert_clock() {
        let mut state = AlertSuppression::default();
        let t0 = Instant::now();
        state.record("db:error:0.00".into(), t0);
        state.clear_signature();
        assert!(!state.remembers_failure());
        assert_eq!(state.last_alert_at, Some(t0));
    }
}
