//! # tgrelay-settings
//!
//! Configuration for the bridge process, loaded once at startup from three
//! layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: optional JSON, deep-merged over defaults
//! 3. **Environment variables**: legacy names and `TGRELAY_*` overrides
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    CONFIG_ENV, deep_merge, load_settings, load_settings_from_path, load_settings_with,
    settings_path_from_env,
};
pub use types::*;
