//! Server configuration.

use std::time::Duration;

use tgrelay_settings::ServerSettings;

/// Runtime configuration for [`crate::RelayServer`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Per-call handler timeout. `None` waits indefinitely.
    pub handler_timeout: Option<Duration>,
    /// How long shutdown waits for in-flight requests.
    pub shutdown_grace: Duration,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            handler_timeout: None,
            shutdown_grace: Duration::from_secs(10),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            handler_timeout: settings.handler_timeout_secs.map(Duration::from_secs),
            shutdown_grace: Duration::from_secs(settings.shutdown_grace_secs),
            max_body_bytes: settings.max_body_bytes,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_loopback_on_any_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
        assert!(cfg.handler_timeout.is_none());
    }

    #[test]
    fn from_settings() {
        let settings = ServerSettings {
            port: 9000,
            handler_timeout_secs: Some(30),
            ..ServerSettings::default()
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.handler_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(10));
    }
}
