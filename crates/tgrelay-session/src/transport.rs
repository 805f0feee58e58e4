//! The seam between the session facade and the wire.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::PlatformError;

/// A platform method invoker.
///
/// `call` sends one named method with a JSON payload and returns the decoded
/// `result` on success. Implementations must be safe to share across tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke `method` with `payload`.
    async fn call(&self, method: &str, payload: Value) -> Result<Value, PlatformError>;

    /// Release any held connections. Called once during disconnect.
    async fn close(&self) {}
}
