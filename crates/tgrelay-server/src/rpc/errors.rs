//! Handler error type.

use tgrelay_session::PlatformError;

/// Error returned by a method handler.
///
/// `Display` is what the caller sees in the error envelope, unredacted.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Parameters did not bind to the handler's argument type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// The platform call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The handler exceeded the configured call timeout.
    #[error("Handler for '{method}' timed out after {secs}s")]
    TimedOut {
        /// Operation name.
        method: String,
        /// Configured limit.
        secs: u64,
    },
}

impl RpcError {
    /// Short machine-readable label, used for metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "invalid_params",
            Self::Platform(PlatformError::NotAuthorized) => "not_authorized",
            Self::Platform(_) => "platform",
            Self::TimedOut { .. } => "timeout",
        }
    }

    /// Shorthand for a parameter error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}
