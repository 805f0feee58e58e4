//! `tgrelay serve`: wire settings, session, dispatcher, and HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tgrelay_core::logging::{self, LogFormat};
use tgrelay_server::{DrainOutcome, Dispatcher, RelayServer, ServerConfig, default_registry};
use tgrelay_session::{BotApiTransport, Credentials, Session, SessionStore};
use tgrelay_settings::{CONFIG_ENV, RelaySettings, load_settings_with};
use tracing::{info, warn};

/// Flags for `serve`. Each overrides the settings file and environment.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// JSON settings file (defaults to `$TGRELAY_CONFIG`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind.
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the session artifact.
    #[arg(long)]
    pub session_dir: Option<PathBuf>,

    /// Session artifact name.
    #[arg(long)]
    pub session_name: Option<String>,

    /// Per-call handler timeout in seconds.
    #[arg(long)]
    pub handler_timeout_secs: Option<u64>,

    /// Log filter directive (e.g. `info`, `tgrelay_server=debug`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format: `compact` or `json`.
    #[arg(long, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format '{value}'"))
}

impl ServeArgs {
    fn apply(self, settings: &mut RelaySettings) {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(secs) = self.handler_timeout_secs {
            settings.server.handler_timeout_secs = Some(secs);
        }
        if let Some(dir) = self.session_dir {
            settings.session.dir = dir;
        }
        if let Some(name) = self.session_name {
            settings.session.name = name;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

/// Run the bridge until the session disconnects.
pub async fn run(args: ServeArgs) -> Result<()> {
    run_with_env(args, |name| std::env::var(name).ok()).await
}

/// [`run`] with environment variables read through `lookup`.
async fn run_with_env<F>(args: ServeArgs, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = args
        .config
        .clone()
        .or_else(|| lookup(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));
    let mut settings =
        load_settings_with(config_path.as_deref(), lookup).context("Failed to load settings")?;
    args.apply(&mut settings);

    logging::init_subscriber(&settings.logging.level, settings.logging.format);
    info!(platform = ?settings.platform, session = ?settings.session, "starting bridge");

    let platform = &settings.platform;
    let credentials = Credentials::new(
        platform.api_id.as_deref(),
        platform.api_hash.as_deref(),
        platform.phone_number.as_deref(),
    )?;
    let transport = BotApiTransport::new(
        platform.api_base.clone(),
        &credentials,
        Duration::from_secs(platform.connect_timeout_secs),
    )?;
    let store = SessionStore::new(settings.session.artifact_path());

    info!("starting platform session");
    let session = Session::start(Arc::new(transport), &credentials, store)
        .await
        .context("Failed to authorize platform session")?;

    let metrics = tgrelay_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings.server);
    let registry = Arc::new(default_registry());
    let method_count = registry.methods().len();
    let dispatcher = Dispatcher::new(registry, Arc::clone(&session))
        .with_timeout(config.handler_timeout);
    let server = RelayServer::new(config, dispatcher).with_metrics(metrics);

    let handle = server
        .listen()
        .await
        .context("Failed to bind HTTP listener")?;
    info!(
        "bridge listening on http://{} ({method_count} methods registered)",
        handle.addr()
    );

    let signal_session = Arc::clone(&session);
    let _signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, disconnecting session");
                signal_session.disconnect().await;
            }
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    session.wait_disconnected().await;
    // Revocation reaches Disconnected without a disconnect call; persist and
    // close the transport anyway.
    session.disconnect().await;

    info!("session disconnected, shutting down");
    if server.drain(handle).await == DrainOutcome::Abandoned {
        warn!("some requests were cut off by the shutdown grace period");
    }
    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn flags_override_settings() {
        let mut settings = RelaySettings::default();
        ServeArgs {
            port: Some(9100),
            session_dir: Some(PathBuf::from("/data/sessions")),
            handler_timeout_secs: Some(15),
            log_format: Some(LogFormat::Json),
            ..ServeArgs::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.handler_timeout_secs, Some(15));
        assert_eq!(
            settings.session.artifact_path(),
            PathBuf::from("/data/sessions/tg_session.json")
        );
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn log_format_parser() {
        assert_eq!(parse_log_format("JSON"), Ok(LogFormat::Json));
        assert!(parse_log_format("xml").is_err());
    }

    fn env(pairs: &[(&'static str, String)]) -> impl Fn(&str) -> Option<String> + use<> {
        let pairs = pairs.to_vec();
        move |name: &str| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone())
    }

    #[tokio::test]
    async fn missing_api_id_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = env(&[
            ("SESSION_DIR", dir.path().display().to_string()),
            ("TGRELAY_API_BASE", "http://127.0.0.1:9".to_owned()),
        ]);

        let err = run_with_env(ServeArgs::default(), lookup).await.unwrap_err();
        assert_eq!(err.to_string(), "missing platform credential: API_ID");
        assert!(!dir.path().join("tg_session.json").exists());
    }

    #[tokio::test]
    async fn missing_api_hash_is_fatal() {
        let lookup = env(&[("API_ID", "12345".to_owned())]);

        let err = run_with_env(ServeArgs::default(), lookup).await.unwrap_err();
        assert_eq!(err.to_string(), "missing platform credential: API_HASH");
    }

    #[tokio::test]
    async fn rejected_credentials_are_fatal() {
        let platform = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot12345:secret/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .expect(1)
            .mount(&platform)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let lookup = env(&[
            ("API_ID", "12345".to_owned()),
            ("API_HASH", "secret".to_owned()),
            ("TGRELAY_API_BASE", platform.uri()),
            ("SESSION_DIR", dir.path().display().to_string()),
        ]);

        let err = run_with_env(ServeArgs::default(), lookup).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to authorize platform session");
        assert!(format!("{err:#}").contains("Unauthorized"));
        assert!(!dir.path().join("tg_session.json").exists());
    }

    #[tokio::test]
    async fn config_path_comes_from_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("tgrelay.json");
        std::fs::write(&config, "not json").unwrap();
        let lookup = env(&[(CONFIG_ENV, config.display().to_string())]);

        let err = run_with_env(ServeArgs::default(), lookup).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load settings");
    }
}
