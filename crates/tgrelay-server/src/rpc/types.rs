//! Wire and dispatch types for `/api/call`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::Value;

/// Raw request body as callers send it.
#[derive(Debug, Default, Deserialize)]
pub struct CallRequest {
    /// Operation name.
    #[serde(default)]
    pub method: Option<String>,
    /// Named arguments.
    #[serde(default)]
    pub params: Option<Map<String, JsonValue>>,
}

/// A decoded call, ready for dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodCall {
    /// Operation name. Empty means "not given".
    pub operation: String,
    /// Named arguments.
    pub params: Map<String, JsonValue>,
}

impl MethodCall {
    /// Build a call from an operation name and a params object.
    pub fn new(operation: impl Into<String>, params: Map<String, JsonValue>) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }

    /// Decode a request body.
    ///
    /// The body must be a JSON object. `method` may be absent or `null`
    /// (caught later as a validation failure); `params` may be absent or
    /// `null` (treated as empty). Anything else that does not fit is a
    /// decode error.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        let request: CallRequest = serde_json::from_slice(body)?;
        Ok(Self {
            operation: request.method.unwrap_or_default(),
            params: request.params.unwrap_or_default(),
        })
    }
}

/// Failure category. Decides the HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed.
    Validation,
    /// No handler resolves for the operation.
    NotFound,
    /// The handler ran and failed.
    Execution,
}

impl ErrorKind {
    /// HTTP status for this category.
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Execution => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Execution => "execution",
        }
    }
}

/// Outcome of one dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodResult {
    /// Handler returned normally.
    Success(Value),
    /// Dispatch or handler failure.
    Failure {
        /// Category.
        kind: ErrorKind,
        /// Caller-visible message.
        message: String,
    },
}

impl MethodResult {
    /// Shorthand for a failure.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// HTTP status plus the encoded response envelope.
    pub fn into_response_parts(self) -> (StatusCode, Envelope) {
        match self {
            Self::Success(value) => (
                StatusCode::OK,
                Envelope::Success {
                    result: tgrelay_core::encode(&value),
                },
            ),
            Self::Failure { kind, message } => {
                (kind.status_code(), Envelope::Error { error: message })
            }
        }
    }
}

/// Response body of `/api/call`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    /// `{"status": "success", "result": ...}`
    Success {
        /// Encoded handler result.
        result: JsonValue,
    },
    /// `{"status": "error", "error": "..."}`
    Error {
        /// Error text.
        error: String,
    },
}
