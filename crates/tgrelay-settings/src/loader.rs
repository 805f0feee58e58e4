//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If a settings file is given and exists, deep-merge it over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! The unprefixed names (`API_ID`, `API_HASH`, `PHONE_NUMBER`, `HTTP_PORT`,
//! `SESSION_DIR`) are what existing deployments already export; the
//! `TGRELAY_*` names cover everything else.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tgrelay_core::logging::LogFormat;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Env var naming an optional settings file.
pub const CONFIG_ENV: &str = "TGRELAY_CONFIG";

/// Resolve the settings file path from `TGRELAY_CONFIG`, if set.
pub fn settings_path_from_env() -> Option<PathBuf> {
    read_env_string(CONFIG_ENV).map(PathBuf::from)
}

/// Load settings from an optional file with env var overrides.
pub fn load_settings(path: Option<&Path>) -> Result<RelaySettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Like [`load_settings`], reading overrides through `lookup` instead of the
/// process environment.
pub fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Result<RelaySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match path {
        Some(path) => load_file(path)?,
        None => RelaySettings::default(),
    };
    apply_overrides(&mut settings, lookup);
    Ok(settings)
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    load_settings(Some(path))
}

fn load_file(path: &Path) -> Result<RelaySettings> {
    let defaults =
        serde_json::to_value(RelaySettings::default()).map_err(|e| SettingsError::json(path, e))?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        let user: Value =
            serde_json::from_str(&content).map_err(|e| SettingsError::json(path, e))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(|e| SettingsError::json(path, e))
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let parsed = |name: &str, parse: &dyn Fn(&str) -> Option<u64>| {
        let val = string(name)?;
        let result = parse(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    };

    // ── Platform ────────────────────────────────────────────────────
    if let Some(v) = string("API_ID") {
        settings.platform.api_id = Some(v);
    }
    if let Some(v) = string("API_HASH") {
        settings.platform.api_hash = Some(v);
    }
    if let Some(v) = string("PHONE_NUMBER") {
        settings.platform.phone_number = Some(v);
    }
    if let Some(v) = string("TGRELAY_API_BASE") {
        settings.platform.api_base = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    let port_range = |v: &str| parse_u16_range(v, 1, 65535).map(u64::from);
    for name in ["HTTP_PORT", "TGRELAY_PORT"] {
        if let Some(v) = parsed(name, &port_range).and_then(|p| u16::try_from(p).ok()) {
            settings.server.port = v;
        }
    }
    if let Some(v) = string("TGRELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = parsed("TGRELAY_HANDLER_TIMEOUT_SECS", &|v: &str| parse_u64_range(v, 1, 86_400)) {
        settings.server.handler_timeout_secs = Some(v);
    }

    // ── Session ─────────────────────────────────────────────────────
    if let Some(v) = string("SESSION_DIR") {
        settings.session.dir = PathBuf::from(v);
    }
    if let Some(v) = string("TGRELAY_SESSION_NAME") {
        settings.session.name = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("TGRELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("TGRELAY_LOG_FORMAT") {
        match LogFormat::parse(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "TGRELAY_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
