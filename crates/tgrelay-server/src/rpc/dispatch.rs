//! Request dispatch: validate, resolve, invoke, classify.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tgrelay_session::Session;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::metrics::{RPC_ERRORS_TOTAL, RPC_REQUEST_DURATION_SECONDS, RPC_REQUESTS_TOTAL};
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodRegistry;
use crate::rpc::types::{ErrorKind, MethodCall, MethodResult};

/// Calls slower than this log a warning.
const SLOW_CALL: Duration = Duration::from_secs(5);

/// Label used for operations that did not resolve, to bound label cardinality.
const UNKNOWN_METHOD_LABEL: &str = "unknown";

/// Routes decoded calls to handlers.
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    session: Arc<Session>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher with no call timeout.
    pub fn new(registry: Arc<MethodRegistry>, session: Arc<Session>) -> Self {
        Self {
            registry,
            session,
            timeout: None,
        }
    }

    /// Bound each handler invocation. `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The registry calls resolve against.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// The session handlers run against.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Dispatch one call. Never fails: every outcome is a [`MethodResult`].
    pub async fn dispatch(&self, call: MethodCall) -> MethodResult {
        let span = info_span!("rpc", request_id = %Uuid::now_v7(), method = %call.operation);
        self.dispatch_inner(call).instrument(span).await
    }

    async fn dispatch_inner(&self, call: MethodCall) -> MethodResult {
        let MethodCall { operation, params } = call;

        if operation.is_empty() {
            counter!(RPC_ERRORS_TOTAL, "method" => UNKNOWN_METHOD_LABEL, "error_type" => ErrorKind::Validation.as_str())
                .increment(1);
            return MethodResult::failure(ErrorKind::Validation, "Method name is required");
        }

        let Some(entry) = self.registry.resolve(&operation) else {
            counter!(RPC_ERRORS_TOTAL, "method" => UNKNOWN_METHOD_LABEL, "error_type" => ErrorKind::NotFound.as_str())
                .increment(1);
            info!("method not found");
            return MethodResult::failure(
                ErrorKind::NotFound,
                format!("Method '{operation}' not found"),
            );
        };

        counter!(RPC_REQUESTS_TOTAL, "method" => entry.name.clone()).increment(1);
        info!(tier = ?entry.tier, param_keys = ?params.keys().collect::<Vec<_>>(), "received request");
        debug!(?params, "request params");

        let start = Instant::now();
        let invocation = entry.handler.handle(params, &self.session);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .unwrap_or_else(|_| {
                    Err(RpcError::TimedOut {
                        method: operation.clone(),
                        secs: limit.as_secs(),
                    })
                }),
            None => invocation.await,
        };

        let elapsed = start.elapsed();
        histogram!(RPC_REQUEST_DURATION_SECONDS, "method" => entry.name.clone())
            .record(elapsed.as_secs_f64());
        if elapsed >= SLOW_CALL {
            warn!(duration_secs = elapsed.as_secs_f64(), "slow RPC request");
        }

        match outcome {
            Ok(value) => MethodResult::Success(value),
            Err(err) => {
                counter!(RPC_ERRORS_TOTAL, "method" => entry.name.clone(), "error_type" => err.code())
                    .increment(1);
                match &err {
                    RpcError::InvalidParams { .. } => warn!(error = %err, "invalid params"),
                    _ => error!(error = %err, code = err.code(), "error executing method"),
                }
                MethodResult::failure(ErrorKind::Execution, err.to_string())
            }
        }
    }
}
