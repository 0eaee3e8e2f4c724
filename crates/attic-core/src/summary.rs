//! Derived health summary and overall classification.
//!
//! A [`HealthSummary`] is recomputed from scratch on every snapshot and never
//! persisted across snapshots. Classification rules:
//!
//! - **critical** — any critical-service errors, or a strict majority of
//!   services in error (`error_count * 2 > total`, so odd totals need more
//!   than half).
//! - **warning** — any service in error, or any service not healthy.
//! - **healthy** — everything else, including the degenerate zero-service
//!   snapshot (average health score defined as `0.0`, never `NaN`).

use serde::{Deserialize, Serialize};

use crate::health::{ServiceStatus, StatusSnapshot};

/// Overall platform health classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    /// All services healthy.
    Healthy,
    /// Degraded but no critical failures.
    Warning,
    /// Critical-service errors or a majority of services failing.
    Critical,
}

/// Summary derived from the latest [`StatusSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    /// Overall classification.
    pub overall: HealthLevel,
    /// Total number of services in the snapshot.
    pub total_services: usize,
    /// Services with status `healthy`.
    pub healthy_services: usize,
    /// Services with status `error`.
    pub error_services: usize,
    /// Critical-error count from the snapshot's error summary.
    pub critical_errors: u64,
    /// Arithmetic mean of all health scores; `0.0` for an empty snapshot.
    pub average_health_score: f64,
    /// Whether the platform reported maintenance mode.
    pub maintenance_mode: bool,
}

impl HealthSummary {
    /// Derive the summary for a snapshot. Pure; no side effects.
    #[must_use]
    pub fn derive(snapshot: &StatusSnapshot) -> Self {
        let total = snapshot.services.len();
        let healthy = snapshot
            .services
            .values()
            .filter(|s| s.status == ServiceStatus::Healthy)
            .count();
        let errors = snapshot
            .services
            .values()
            .filter(|s| s.status == ServiceStatus::Error)
            .count();
        let critical_errors = snapshot.error_summary.critical;

        // Zero services is a defined degenerate case: average 0.0, healthy.
        let average = if total == 0 {
            0.0
        } else {
            snapshot.services.values().map(|s| s.health_score).sum::<f64>() / total as f64
        };

        let overall = if critical_errors > 0 || errors * 2 > total {
            // `errors * 2 > total` is false when total == 0.
            HealthLevel::Critical
        } else if errors > 0 || healthy < total {
            HealthLevel::Warning
        } else {
            HealthLevel::Healthy
        };

        Self {
            overall,
            total_services: total,
            healthy_services: healthy,
            error_services: errors,
            critical_errors,
            average_health_score: average,
            maintenance_mode: snapshot.maintenance_mode,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
