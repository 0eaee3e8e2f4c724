//! Service-health wire types — the payload of the `status` tag.
//!
//! A [`StatusSnapshot`] is authoritative and total: each one fully replaces
//! the previous state, there is no merging. Field names are camelCase to
//! match the platform's JSON wire format. Optional sections deserialize to
//! `None`/defaults so partial snapshots from older servers still parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reported status of a single platform service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Operating normally.
    Healthy,
    /// Degraded but functional.
    Warning,
    /// Failing.
    Error,
    /// Deliberately offline for maintenance.
    Maintenance,
    /// Coming up.
    Starting,
    /// Shutting down.
    Stopping,
    /// No recent report.
    Unknown,
}

impl ServiceStatus {
    /// Wire name of the status, as it appears in alert signatures.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Unknown => "unknown",
        }
    }
}

/// Operational priority of a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    /// Failure pages an operator.
    Critical,
    /// Failure degrades the platform.
    High,
    /// Failure is tolerable short-term.
    Medium,
    /// Background/auxiliary.
    Low,
}

/// Health report for a single service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceRecord {
    /// Service name (also the key in [`StatusSnapshot::services`]).
    pub name: String,
    /// Reported status.
    pub status: ServiceStatus,
    /// Operational priority.
    pub priority: ServicePriority,
    /// Health score in `[0, 1]`.
    pub health_score: f64,
    /// ISO 8601 timestamp of the last health check.
    pub last_check: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Last observed response time in milliseconds.
    pub response_time_ms: u64,
    /// Cumulative error count.
    pub error_count: u64,
    /// Recovery attempts made so far.
    pub recovery_attempts: u32,
    /// Free-text status message.
    pub message: String,
    /// Service-specific structured metrics, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Map<String, Value>>,
    /// Suggested recovery action, if the platform has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_suggestion: Option<String>,
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            status: ServiceStatus::Unknown,
            priority: ServicePriority::Medium,
            health_score: 0.0,
            last_check: String::new(),
            uptime_seconds: 0,
            response_time_ms: 0,
            error_count: 0,
            recovery_attempts: 0,
            message: String::new(),
            metrics: None,
            recovery_suggestion: None,
        }
    }
}

/// Platform-wide error counters carried on every snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorSummary {
    /// Total errors since platform start.
    pub total: u64,
    /// Errors currently affecting critical services.
    pub critical: u64,
    /// Errors in the recent window.
    pub recent: u64,
}

/// System resource metrics, when the platform reports them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceMetrics {
    /// CPU utilisation percent.
    pub cpu_percent: f64,
    /// Memory utilisation percent.
    pub memory_percent: f64,
    /// Disk utilisation percent.
    pub disk_percent: f64,
    /// Bytes received on the network since start.
    pub network_rx_bytes: u64,
    /// Bytes sent on the network since start.
    pub network_tx_bytes: u64,
    /// Active client connections.
    pub active_connections: u32,
    /// Archival/download tasks currently running.
    pub tasks_running: u32,
    /// Tasks waiting in the queue.
    pub tasks_queued: u32,
    /// 1/5/15-minute load averages.
    pub load_average: Vec<f64>,
}

/// A full service-health snapshot — the `status` tag payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusSnapshot {
    /// All known services, keyed by name. `BTreeMap` keeps iteration
    /// deterministic for summary derivation and alert signatures.
    pub services: BTreeMap<String, ServiceRecord>,
    /// Whether the platform is in maintenance mode.
    pub maintenance_mode: bool,
    /// Operator-facing maintenance message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_message: Option<String>,
    /// Estimated end of the maintenance window (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_eta: Option<String>,
    /// Platform-wide error counters.
    pub error_summary: ErrorSummary,
    /// System resource metrics, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceMetrics>,
    /// ISO 8601 timestamp of the snapshot.
    pub timestamp: String,
}

impl StatusSnapshot {
    /// Look up a single service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceRecord> {
        self.services.get(name)
    }

    /// Services with `priority == critical` and `status == error`, in name
    /// order. This is the set that drives critical alerting.
    #[must_use]
    pub fn critical_failures(&self) -> Vec<&ServiceRecord> {
        self.services
            .values()
            .filter(|s| s.priority == ServicePriority::Critical && s.status == ServiceStatus::Error)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, status: ServiceStatus, priority: ServicePriority) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            status,
            priority,
            health_score: 1.0,
            ..ServiceRecord::default()
        }
    }

    #[test]
    fn snapshot_parses_from_camel_case_wire_format() {
        let raw = json!({
            "services": {
                "db": {
                    "name": "db",
                    "status": "error",
                    "priority": "critical",
                    "healthScore": 0.0,
                    "lastCheck": "2026-08-23T10:00:00Z",
                    "uptimeSeconds": 120,
                    "responseTimeMs": 900,
                    "errorCount": 4,
                    "recoveryAttempts": 2,
                    "message": "connection pool exhausted"
                }
            },
            "maintenanceMode": false,
            "errorSummary": { "total": 4, "critical": 1, "recent": 2 },
            "timestamp": "2026-08-23T10:00:01Z"
        });
        let snap: StatusSnapshot = serde_json::from_value(raw).unwrap();
        let db = snap.service("db").unwrap();
        assert_eq!(db.status, ServiceStatus::Error);
        assert_eq!(db.priority, ServicePriority::Critical);
        assert_eq!(db.error_count, 4);
        assert_eq!(snap.error_summary.critical, 1);
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let snap: StatusSnapshot = serde_json::from_value(json!({})).unwrap();
        assert!(snap.services.is_empty());
        assert!(!snap.maintenance_mode);
        assert!(snap.resources.is_none());
    }

    #[test]
    fn critical_failures_sorted_and_filtered() {
        let mut snap = StatusSnapshot::default();
        let _ = snap.services.insert(
            "web".into(),
            record("web", ServiceStatus::Error, ServicePriority::Critical),
        );
        let _ = snap.services.insert(
            "cache".into(),
            record("cache", ServiceStatus::Error, ServicePriority::Critical),
        );
        // Critical but healthy — excluded.
        let _ = snap.services.insert(
            "db".into(),
            record("db", ServiceStatus::Healthy, ServicePriority::Critical),
        );
        // Erroring but low priority — excluded.
        let _ = snap.services.insert(
            "mailer".into(),
            record("mailer", ServiceStatus::Error, ServicePriority::Low),
        );

        let failures = snap.critical_failures();
        let names: Vec<&str> = failures.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["cache", "web"]);
    }

    #[test]
    fn status_as_str_matches_wire_name() {
        let v = serde_json::to_value(ServiceStatus::Maintenance).unwrap();
        assert_eq!(v, ServiceStatus::Maintenance.as_str());
    }
}
