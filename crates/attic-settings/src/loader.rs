//! Settings loading: defaults, file deep-merge, environment overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::ConsoleSettings;

/// Path of the user settings file.
///
/// `ATTIC_CONSOLE_SETTINGS` overrides the location; otherwise
/// `$HOME/.attic/console.json`.
#[must_use]
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("ATTIC_CONSOLE_SETTINGS") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".attic").join("console.json")
}

/// Load settings from the default location.
///
/// A missing file yields compiled defaults; an unreadable or invalid file is
/// logged and also falls back to defaults. Environment overrides and
/// validation are applied in both cases.
#[must_use]
pub fn load_settings() -> ConsoleSettings {
    let path = settings_path();
    if !path.exists() {
        let mut settings = ConsoleSettings::default();
        apply_env_overrides(&mut settings);
        settings.validate();
        return settings;
    }
    match load_settings_from_path(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            let mut settings = ConsoleSettings::default();
            apply_env_overrides(&mut settings);
            settings.validate();
            settings
        }
    }
}

/// Load settings from a specific file path.
///
/// The file is deep-merged over compiled defaults, then environment
/// overrides and validation are applied.
///
/// # Errors
///
/// Returns [`SettingsError`] when the file cannot be read or parsed.
pub fn load_settings_from_path(path: &Path) -> Result<ConsoleSettings> {
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_value: Value = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let defaults = serde_json::to_value(ConsoleSettings::default())
        .expect("default settings always serialize");
    let merged = deep_merge(defaults, file_value);

    let mut settings: ConsoleSettings =
        serde_json::from_value(merged).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key-by-key recursively; any other overlay value (including
/// `null`) replaces the base value.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `ATTIC_*` environment variable overrides.
fn apply_env_overrides(settings: &mut ConsoleSettings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Testable core of [`apply_env_overrides`]: the lookup is injected.
fn apply_overrides_from(
    settings: &mut ConsoleSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring unparseable {key}={raw}");
                None
            }
        }
    }

    if let Some(url) = lookup("ATTIC_WS_URL") {
        settings.server.ws_url = Some(url);
    }
    if let Some(host) = lookup("ATTIC_SERVER_HOST") {
        settings.server.host = host;
    }
    if let Some(raw) = lookup("ATTIC_SERVER_PORT") {
        if let Some(port) = parse_or_warn("ATTIC_SERVER_PORT", &raw) {
            settings.server.port = port;
        }
    }
    if let Some(raw) = lookup("ATTIC_MAX_RECONNECT_ATTEMPTS") {
        if let Some(n) = parse_or_warn("ATTIC_MAX_RECONNECT_ATTEMPTS", &raw) {
            settings.realtime.max_reconnect_attempts = n;
        }
    }
    if let Some(raw) = lookup("ATTIC_BASE_RETRY_DELAY_MS") {
        if let Some(ms) = parse_or_warn("ATTIC_BASE_RETRY_DELAY_MS", &raw) {
            settings.realtime.base_retry_delay_ms = ms;
        }
    }
    if let Some(raw) = lookup("ATTIC_ALERT_COOLDOWN_SECS") {
        if let Some(secs) = parse_or_warn("ATTIC_ALERT_COOLDOWN_SECS", &raw) {
            settings.realtime.alert_cooldown_secs = secs;
        }
    }
    if let Some(raw) = lookup("ATTIC_POLL_INTERVAL_MS") {
        if let Some(ms) = parse_or_warn("ATTIC_POLL_INTERVAL_MS", &raw) {
            settings.realtime.poll_interval_ms = ms;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
