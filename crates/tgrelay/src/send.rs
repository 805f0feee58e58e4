//! `tgrelay send`: batch-send text messages through a running bridge.
//!
//! Tasks come from the first non-empty source:
//! 1. `--list-file`, or an inline list (`--list` / `TG_SEND_LIST`), one
//!    `target message` pair per line
//! 2. `--target` / `TG_TARGET` (comma or newline separated) sharing
//!    `--message` / `TG_MESSAGE`
//! 3. positional `TARGET TEXT`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tgrelay_core::logging::{self, LogFormat};
use tracing::{info, warn};

/// Bridge endpoint used when none is configured.
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/api/call";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_SNIPPET: usize = 200;

/// Flags for `send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Bridge call endpoint.
    #[arg(long, env = "TG_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// File with one `target message` pair per line.
    #[arg(long)]
    pub list_file: Option<PathBuf>,

    /// Inline list in the same format as `--list-file`.
    #[arg(long = "list", env = "TG_SEND_LIST", hide_env_values = true)]
    pub list: Option<String>,

    /// Comma or newline separated targets that share `--message`.
    #[arg(long = "target", env = "TG_TARGET")]
    pub targets: Option<String>,

    /// Default message for `--target` and for list lines without text.
    #[arg(long, env = "TG_MESSAGE", hide_env_values = true)]
    pub message: Option<String>,

    /// Extra attempts after a connection-level failure.
    #[arg(long, default_value_t = 1)]
    pub retries: u32,

    /// Delay between attempts.
    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Single target (with TEXT), used when no other source is set.
    pub target: Option<String>,

    /// Message for TARGET.
    pub text: Option<String>,
}

/// Chat identifier as sent to the bridge: numeric ids as integers,
/// usernames and phone numbers as strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Target {
    /// Numeric chat id.
    Id(i64),
    /// Username, phone number, or link.
    Name(String),
}

/// Turn `123` or `-100123` into an id. Anything else stays a string.
pub fn coerce_target(raw: &str) -> Target {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = raw.parse() {
            return Target::Id(id);
        }
    }
    Target::Name(raw.to_owned())
}

/// One message to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendTask {
    /// Username, phone number, or numeric chat id as written in the source.
    pub target: String,
    /// Text to send.
    pub message: String,
}

impl SendTask {
    fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Parse a `target message` list.
///
/// Blank lines and lines starting with `#` are skipped. The message is
/// everything after the first run of whitespace. A line holding only a
/// target uses `default_message`, or is skipped when there is none.
pub fn parse_send_list(text: &str, default_message: Option<&str>) -> Vec<SendTask> {
    let mut tasks = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((target, message)) => tasks.push(SendTask::new(target, message.trim_start())),
            None => match default_message {
                Some(message) => tasks.push(SendTask::new(line, message)),
                None => warn!(line, "skipping line without message and no default message"),
            },
        }
    }
    tasks
}

/// Split a comma or newline separated target list.
pub fn split_targets(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve the task list from the configured sources.
pub fn collect_tasks(args: &SendArgs) -> Result<Vec<SendTask>> {
    let default_message = non_empty(args.message.as_deref());

    let list = match &args.list_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read send list {}", path.display()))?,
        ),
        None => args.list.clone(),
    };
    if let Some(list) = non_empty(list.as_deref()) {
        let tasks = parse_send_list(list, default_message);
        if !tasks.is_empty() {
            return Ok(tasks);
        }
    }

    if let (Some(targets), Some(message)) = (non_empty(args.targets.as_deref()), default_message)
    {
        return Ok(split_targets(targets)
            .into_iter()
            .map(|t| SendTask::new(t, message))
            .collect());
    }

    match (args.target.as_deref(), args.text.as_deref()) {
        (Some(target), Some(text)) if !target.is_empty() && !text.is_empty() => {
            Ok(vec![SendTask::new(target, text)])
        }
        _ => Ok(Vec::new()),
    }
}

/// Why a single send failed.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The bridge could not be reached or did not answer in time.
    #[error("cannot reach bridge at {url}: {source}")]
    Transport {
        /// Endpoint that was called.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// Non-200 response.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },
    /// 200 response without `status: success`.
    #[error("{0}")]
    Rejected(String),
}

impl SendError {
    /// Only connection-level failures are worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[derive(Deserialize)]
struct CallResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the bridge's call endpoint.
#[derive(Debug)]
pub struct BridgeClient {
    client: reqwest::Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
}

impl BridgeClient {
    /// Client for `url` that repeats connection failures `retries` times,
    /// waiting `retry_delay` between attempts.
    pub fn new(url: impl Into<String>, retries: u32, retry_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            retries,
            retry_delay,
        })
    }

    /// Send one task, repeating connection-level failures.
    pub async fn send(&self, task: &SendTask) -> Result<(), SendError> {
        let mut attempt = 0;
        loop {
            match self.send_once(task).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(entity = %task.target, attempt, error = %e, "retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                result => return result,
            }
        }
    }

    async fn send_once(&self, task: &SendTask) -> Result<(), SendError> {
        let body = json!({
            "method": "send_message",
            "params": {
                "entity": coerce_target(&task.target),
                "message": task.message,
            },
        });

        let transport = |source| SendError::Transport {
            url: self.url.clone(),
            source,
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;
        if status != reqwest::StatusCode::OK {
            return Err(SendError::Http {
                status: status.as_u16(),
                body: text.chars().take(BODY_SNIPPET).collect(),
            });
        }

        match serde_json::from_str::<CallResponse>(&text) {
            Ok(r) if r.status == "success" => Ok(()),
            Ok(r) => Err(SendError::Rejected(
                r.error.unwrap_or_else(|| format!("status '{}'", r.status)),
            )),
            Err(e) => Err(SendError::Rejected(format!("invalid response: {e}"))),
        }
    }
}

/// Run every task and fail if any of them failed.
pub async fn run(args: SendArgs) -> Result<()> {
    logging::init_subscriber("info", LogFormat::Compact);

    let tasks = collect_tasks(&args)?;
    if tasks.is_empty() {
        warn!("no send tasks configured; set TG_SEND_LIST, TG_TARGET/TG_MESSAGE, or pass TARGET TEXT");
        return Ok(());
    }

    let client = BridgeClient::new(
        args.service_url,
        args.retries,
        Duration::from_millis(args.retry_delay_ms),
    )?;

    info!(count = tasks.len(), "sending");
    let mut succeeded = 0usize;
    for task in &tasks {
        match client.send(task).await {
            Ok(()) => {
                succeeded += 1;
                info!(entity = %task.target, "sent");
            }
            Err(e) => warn!(entity = %task.target, error = %e, "send failed"),
        }
    }

    info!("done: {succeeded}/{} succeeded", tasks.len());
    if succeeded < tasks.len() {
        bail!("{} of {} sends failed", tasks.len() - succeeded, tasks.len());
    }
    Ok(())
}
