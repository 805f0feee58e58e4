//! Bot HTTP API transport.
//!
//! Every method is a `POST {base}/bot{token}/{method}` with a JSON body. The
//! platform always answers with an envelope:
//!
//! ```text
//! {"ok": true,  "result": ...}
//! {"ok": false, "error_code": 400, "description": "...", "parameters": {"retry_after": 5}}
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::errors::{PlatformError, SessionError};
use crate::transport::Transport;

/// Upper bound on a single platform request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// HTTP transport for the Bot API.
pub struct BotApiTransport {
    client: reqwest::Client,
    base: String,
    token: SecretString,
}

impl fmt::Debug for BotApiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotApiTransport")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl BotApiTransport {
    /// Build a transport against `base` (e.g. `https://api.telegram.org`).
    pub fn new(
        base: impl Into<String>,
        credentials: &Credentials,
        connect_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SessionError::Client)?;

        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_owned(),
            token: credentials.token(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base, self.token.expose_secret())
    }
}

#[async_trait]
impl Transport for BotApiTransport {
    async fn call(&self, method: &str, payload: Value) -> Result<Value, PlatformError> {
        debug!(method, "platform request");

        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            // reqwest errors carry the URL, which embeds the token
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?;

        let Ok(envelope) = serde_json::from_slice::<ApiResponse>(&body) else {
            let snippet = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
            warn!(method, status = status.as_u16(), "non-JSON platform response");
            return Err(PlatformError::Decode(format!("HTTP {status}: {snippet}")));
        };

        if envelope.ok {
            return Ok(envelope.result.unwrap_or(Value::Null));
        }

        let code = envelope
            .error_code
            .unwrap_or_else(|| i64::from(status.as_u16()));
        let description = envelope
            .description
            .unwrap_or_else(|| format!("HTTP {status}"));
        let retry_after = envelope.parameters.and_then(|p| p.retry_after);

        warn!(method, code, %description, ?retry_after, "platform rejected request");
        Err(PlatformError::Api {
            code,
            description,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport(server: &MockServer) -> BotApiTransport {
        let creds = Credentials::new(Some("123"), Some("secret"), None).unwrap();
        BotApiTransport::new(server.uri(), &creds, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn success_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:secret/getMe"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 1, "is_bot": true, "first_name": "Relay"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = transport(&server).call("getMe", json!({})).await.unwrap();
        assert_eq!(result["first_name"], "Relay");
    }

    #[tokio::test]
    async fn api_error_keeps_description_and_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:secret/sendMessage"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5",
                "parameters": {"retry_after": 5}
            })))
            .mount(&server)
            .await;

        let err = transport(&server)
            .call("sendMessage", json!({"chat_id": 1, "text": "x"}))
            .await
            .unwrap_err();
        assert_matches!(err, PlatformError::Api { code: 429, retry_after: Some(5), .. });
        assert_eq!(err.to_string(), "Too Many Requests: retry after 5");
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = transport(&server).call("getMe", json!({})).await.unwrap_err();
        assert_matches!(err, PlatformError::Decode(msg) if msg.starts_with("HTTP 502"));
    }

    #[tokio::test]
    async fn unauthorized_is_detected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false, "error_code": 401, "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = transport(&server).call("getMe", json!({})).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn debug_hides_token() {
        let creds = Credentials::new(Some("123"), Some("secret"), None).unwrap();
        let t = BotApiTransport::new("http://localhost/", &creds, Duration::from_secs(1)).unwrap();
        let debug = format!("{t:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(t.method_url("getMe"), "http://localhost/bot123:secret/getMe");
    }
}
