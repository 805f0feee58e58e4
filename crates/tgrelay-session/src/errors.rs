//! Session and platform error types.

use thiserror::Error;

/// Errors raised by platform operations.
///
/// `Display` is the diagnostic text surfaced verbatim to bridge callers, so
/// [`PlatformError::Api`] prints the platform's own description unchanged.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the request.
    #[error("{description}")]
    Api {
        /// Platform error code (HTTP-like: 400, 401, 403, 429, ...).
        code: i64,
        /// Platform-provided description.
        description: String,
        /// Seconds to wait before retrying, when flood control kicked in.
        retry_after: Option<u64>,
    },

    /// Network-level failure talking to the platform.
    #[error("platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with something we could not decode.
    #[error("unexpected platform response: {0}")]
    Decode(String),

    /// The session has not completed authorization.
    #[error("Session is not authorized")]
    NotAuthorized,
}

impl PlatformError {
    /// Whether the platform reports the credentials themselves as invalid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { code: 401, .. })
    }

    /// Shorthand for an API rejection without flood-control info.
    pub fn api(code: i64, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
            retry_after: None,
        }
    }
}

/// Errors raised while establishing or tearing down the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required credential is absent.
    #[error("missing platform credential: {0}")]
    MissingCredentials(&'static str),

    /// The platform refused to authorize the credentials.
    #[error("authorization failed: {0}")]
    Authorization(#[source] PlatformError),

    /// Reading or writing the session artifact failed.
    #[error("session store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    /// The session artifact is not valid JSON for this format.
    #[error("session store is corrupt: {0}")]
    StoreFormat(#[from] serde_json::Error),

    /// The session is not in a state that allows the requested step.
    #[error("session is {0}, cannot {1}")]
    InvalidState(crate::session::SessionState, &'static str),

    /// Building the platform HTTP client failed.
    #[error("failed to build platform client: {0}")]
    Client(#[source] reqwest::Error),
}
