//! # attic-realtime
//!
//! Realtime event pipeline for the attic admin console: one persistent
//! WebSocket connection multiplexing many logical event streams to any
//! number of in-process subscribers, with automatic recovery and
//! deduplicated service-health alerting.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `transport` | Single duplex connection: framing, parsing, linear-backoff reconnection |
//! | `dispatch` | Tag → ordered callback registry with per-callback fault isolation |
//! | `status` | Status aggregator: health summary, cooldown-gated critical alerts |
//! | `bindings` | Watch-channel bridge for declarative consumers |
//! | `client` | `RealtimeClient` context object owning the whole pipeline |
//! | `metrics` | Metric name constants |
//!
//! ## Data Flow
//!
//! `transport` parses inbound frames into envelopes → `dispatch` fans each
//! envelope out by tag → `status` (one subscriber of the `status` tag) folds
//! snapshots into summarized state and raises notices → `bindings` exposes
//! snapshots and connectivity to consumers. Manual actions (reconnect,
//! auto-retry toggle, outbound sends) flow back through `transport`.
//!
//! Nothing in this crate panics or returns `Err` across its public boundary:
//! every failure mode becomes a silent drop, a logged diagnostic, or a
//! [`attic_core::alerts::Notice`].

#![deny(unsafe_code)]

pub mod bindings;
pub mod client;
pub mod dispatch;
pub mod metrics;
pub mod status;
pub mod transport;

pub use bindings::StatusBinding;
pub use client::RealtimeClient;
pub use dispatch::{Dispatcher, Subscription};
pub use status::StatusAggregator;
pub use transport::Transport;
