//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the console's
//! JSON wire format. Each type implements [`Default`] with production default
//! values, and `#[serde(default)]` allows partial JSON — missing fields get
//! their default value during deserialization.

use serde::{Deserialize, Serialize};

/// Root settings type for the attic admin console.
///
/// Loaded from `~/.attic/console.json` with defaults applied for missing
/// fields. `ATTIC_*` environment variables override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Server endpoint settings.
    pub server: ServerSettings,
    /// Realtime transport and alerting settings.
    pub realtime: RealtimeSettings,
    /// Resource warning thresholds.
    pub thresholds: ThresholdSettings,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "attic-console".to_string(),
            server: ServerSettings::default(),
            realtime: RealtimeSettings::default(),
            thresholds: ThresholdSettings::default(),
        }
    }
}

impl ConsoleSettings {
    /// Clamp out-of-range values and correct invalid invariants.
    ///
    /// Called automatically during loading. Bad values are corrected with a
    /// warning rather than rejected, so users get working behavior instead of
    /// a confusing error.
    pub fn validate(&mut self) {
        fn clamp_percent(val: &mut f64, name: &str) {
            if *val < 0.0 || *val > 100.0 {
                let clamped = val.clamp(0.0, 100.0);
                tracing::warn!("{name} out of range ({val}), clamped to {clamped}");
                *val = clamped;
            }
        }

        clamp_percent(&mut self.thresholds.cpu_percent, "cpu_percent");
        clamp_percent(&mut self.thresholds.memory_percent, "memory_percent");
        clamp_percent(&mut self.thresholds.disk_percent, "disk_percent");

        let rt = &mut self.realtime;
        if rt.poll_interval_ms < 100 {
            tracing::warn!(
                "poll_interval_ms ({}) below 100ms floor, correcting",
                rt.poll_interval_ms
            );
            rt.poll_interval_ms = 100;
        }
    }
}

/// Server endpoint settings.
///
/// The realtime endpoint is either the absolute `wsUrl` (when it carries a
/// `ws://`/`wss://` scheme), a relative `wsUrl` path composed with
/// host/port/TLS, or the default `wsPath` composed the same way. The stable
/// per-process client id is appended as the final path segment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Absolute `ws(s)://` URL or relative path for the realtime endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    /// Server host used when `wsUrl` is relative or unset.
    pub host: String,
    /// Server port used when `wsUrl` is relative or unset.
    pub port: u16,
    /// Default realtime endpoint path.
    pub ws_path: String,
    /// Use `wss://` when composing the endpoint.
    pub tls: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            ws_url: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
            ws_path: "/ws".to_string(),
            tls: false,
        }
    }
}

impl ServerSettings {
    /// Resolve the realtime connection target for a client id.
    #[must_use]
    pub fn endpoint(&self, client_id: &str) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        let base = match self.ws_url.as_deref() {
            Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => {
                url.trim_end_matches('/').to_string()
            }
            Some(path) => {
                let path = path.trim_end_matches('/');
                let path = path.strip_prefix('/').unwrap_or(path);
                format!("{scheme}://{}:{}/{path}", self.host, self.port)
            }
            None => {
                let path = self.ws_path.trim_end_matches('/');
                let path = path.strip_prefix('/').unwrap_or(path);
                format!("{scheme}://{}:{}/{path}", self.host, self.port)
            }
        };
        format!("{base}/{client_id}")
    }
}

/// Realtime transport and alerting settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// Reconnect attempts before giving up until a manual reconnect.
    pub max_reconnect_attempts: u32,
    /// Base retry delay in milliseconds; the n-th retry waits `base * n`.
    pub base_retry_delay_ms: u64,
    /// Cooldown between identical critical alerts, in seconds.
    pub alert_cooldown_secs: u64,
    /// Connectivity poll interval for UI bindings, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_retry_delay_ms: 3_000,
            alert_cooldown_secs: 300,
            poll_interval_ms: 1_000,
        }
    }
}

/// Resource warning thresholds (percent).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdSettings {
    /// CPU warning threshold.
    pub cpu_percent: f64,
    /// Memory warning threshold.
    pub memory_percent: f64,
    /// Disk warning threshold.
    pub disk_percent: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 85.0,
            disk_percent: 90.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
