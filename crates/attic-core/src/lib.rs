//! # attic-core
//!
//! Foundation types for the attic admin console realtime pipeline.
//!
//! This crate provides the shared vocabulary the realtime crates depend on:
//!
//! - **Envelopes**: [`envelope::Envelope`] — the unit of dispatch for inbound
//!   frames, plus the [`envelope::tags`] the platform multiplexes
//! - **Health model**: [`health::StatusSnapshot`], [`health::ServiceRecord`],
//!   [`health::ResourceMetrics`] — the `status` tag payload
//! - **Derived summary**: [`summary::HealthSummary`] with its
//!   healthy/warning/critical classification
//! - **Notices**: [`alerts::Notice`] side-effect events and the
//!   [`alerts::AlertSuppression`] dedup/cooldown state
//! - **Payloads**: typed shapes for the non-status tags ([`payloads::LogLine`],
//!   [`payloads::TaskProgress`], …)
//! - **Formatting**: [`format::format_uptime`] and
//!   [`format::format_response_time`] display helpers
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `attic-realtime`.

#![deny(unsafe_code)]

pub mod alerts;
pub mod envelope;
pub mod format;
pub mod health;
pub mod payloads;
pub mod summary;
