//! Metric name constants for the realtime pipeline.
//!
//! The embedding application installs its own metrics recorder; this crate
//! only records. Constants avoid typos across modules.

/// Realtime connections opened (counter).
pub const CONNECTIONS_TOTAL: &str = "realtime_connections_total";
/// Realtime disconnections (counter).
pub const DISCONNECTIONS_TOTAL: &str = "realtime_disconnections_total";
/// Inbound frames dispatched (counter).
pub const FRAMES_TOTAL: &str = "realtime_frames_total";
/// Inbound frames dropped as malformed (counter).
pub const FRAME_PARSE_ERRORS_TOTAL: &str = "realtime_frame_parse_errors_total";
/// Envelopes dropped for lack of subscribers (counter).
pub const DISPATCH_DROPPED_TOTAL: &str = "realtime_dispatch_dropped_total";
/// Subscriber callbacks that panicked during dispatch (counter).
pub const CALLBACK_PANICS_TOTAL: &str = "realtime_callback_panics_total";
/// Outbound messages dropped while disconnected (counter).
pub const SEND_DROPPED_TOTAL: &str = "realtime_send_dropped_total";
/// Critical alerts raised (counter).
pub const ALERTS_TOTAL: &str = "realtime_alerts_total";
