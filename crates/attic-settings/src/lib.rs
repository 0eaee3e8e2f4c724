//! # attic-settings
//!
//! Layered configuration for the attic admin console.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ConsoleSettings::default()`]
//! 2. **User file** — `~/.attic/console.json` (deep-merged over defaults)
//! 3. **Environment variables** — `ATTIC_*` overrides (highest priority)
//!
//! There is no ambient settings global: the application loads once at startup
//! and injects the result (`Arc<ConsoleSettings>`) into the realtime client.
//!
//! # Usage
//!
//! ```no_run
//! use attic_settings::load_settings;
//!
//! let settings = load_settings();
//! println!("retry budget: {}", settings.realtime.max_reconnect_attempts);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
