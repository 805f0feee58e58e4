//! Settings type definitions.
//!
//! Every section implements [`Default`] with production values and is marked
//! `#[serde(default)]`, so a settings file may name only the keys it changes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tgrelay_core::logging::LogFormat;

/// Root settings for the bridge process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// HTTP listener and dispatch behavior.
    pub server: ServerSettings,
    /// Platform credentials and endpoint.
    pub platform: PlatformSettings,
    /// Where the session artifact lives.
    pub session: SessionSettings,
    /// Log level and format.
    pub logging: LoggingSettings,
}

/// HTTP listener and dispatch behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Per-call handler timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_timeout_secs: Option<u64>,
    /// How long shutdown waits for in-flight requests.
    pub shutdown_grace_secs: u64,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            handler_timeout_secs: None,
            shutdown_grace_secs: 10,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Platform credentials and endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformSettings {
    /// Platform API identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    /// Platform API secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_hash: Option<String>,
    /// Phone/identity hint used only during first authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Base URL of the platform HTTP API.
    pub api_base: String,
    /// TCP connect timeout for platform requests.
    pub connect_timeout_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            phone_number: None,
            api_base: "https://api.telegram.org".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for PlatformSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformSettings")
            .field("api_id", &self.api_id)
            .field("api_hash", &self.api_hash.as_ref().map(|_| "[REDACTED]"))
            .field("phone_number", &self.phone_number)
            .field("api_base", &self.api_base)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Where the session artifact lives.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Directory holding the session artifact.
    pub dir: PathBuf,
    /// Artifact file stem.
    pub name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("sessions"),
            name: "tg_session".to_string(),
        }
    }
}

impl SessionSettings {
    /// Full path of the session artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }
}

/// Log level and format.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive (e.g. `info`, `tgrelay_server=debug`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
