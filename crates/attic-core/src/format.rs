//! Display formatting helpers for uptime and response time.
//!
//! Pure functions used by UI code when rendering service records. No state,
//! no locale handling — the admin console renders English.

/// Format an uptime in seconds for display.
///
/// Picks the two most significant units: days+hours, hours+minutes,
/// minutes+seconds, or bare seconds.
///
/// # Examples
///
/// ```
/// use attic_core::format::format_uptime;
///
/// assert_eq!(format_uptime(45), "45s");
/// assert_eq!(format_uptime(750), "12m 30s");
/// assert_eq!(format_uptime(7500), "2h 05m");
/// assert_eq!(format_uptime(273_600), "3d 4h");
/// ```
#[must_use]
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Format a response time in milliseconds for display.
///
/// Sub-second values render as whole milliseconds, anything slower as
/// seconds with two decimals.
///
/// # Examples
///
/// ```
/// use attic_core::format::format_response_time;
///
/// assert_eq!(format_response_time(12), "12ms");
/// assert_eq!(format_response_time(1250), "1.25s");
/// ```
#[must_use]
pub fn format_response_time(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", ms as f64 / 1_000.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_uptime ────────────────────────────────────────────────────

    #[test]
    fn zero_seconds() {
        assert_eq!(format_uptime(0), "0s");
    }

    #[test]
    fn seconds_only() {
        assert_eq!(format_uptime(59), "59s");
    }

    #[test]
    fn minutes_pad_seconds() {
        assert_eq!(format_uptime(61), "1m 01s");
        assert_eq!(format_uptime(600), "10m 00s");
    }

    #[test]
    fn hours_pad_minutes() {
        assert_eq!(format_uptime(3_600), "1h 00m");
        assert_eq!(format_uptime(3_660), "1h 01m");
    }

    #[test]
    fn days_do_not_pad_hours() {
        assert_eq!(format_uptime(86_400), "1d 0h");
        assert_eq!(format_uptime(90_000), "1d 1h");
    }

    #[test]
    fn drops_sub_unit_precision() {
        // 1d 1h 59m 59s still renders as days+hours.
        assert_eq!(format_uptime(86_400 + 3_600 + 3_599), "1d 1h");
    }

    // ── format_response_time ─────────────────────────────────────────────

    #[test]
    fn zero_ms() {
        assert_eq!(format_response_time(0), "0ms");
    }

    #[test]
    fn just_below_one_second() {
        assert_eq!(format_response_time(999), "999ms");
    }

    #[test]
    fn exactly_one_second() {
        assert_eq!(format_response_time(1_000), "1.00s");
    }

    #[test]
    fn long_response_times() {
        assert_eq!(format_response_time(12_345), "12.35s");
    }
}
