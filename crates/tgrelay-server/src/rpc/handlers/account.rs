//! Account handlers: `get_me`, `is_user_authorized`.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::{Encode, Value};
use tgrelay_session::Session;
use tracing::instrument;

use crate::rpc::errors::RpcError;
use crate::rpc::handlers::{NoParams, bind_params};
use crate::rpc::registry::MethodHandler;

/// Fetch the authorized account.
pub struct GetMeHandler;

#[async_trait]
impl MethodHandler for GetMeHandler {
    #[instrument(skip_all, fields(method = "get_me"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let NoParams {} = bind_params(params)?;
        Ok(session.get_me().await?.to_value())
    }
}

/// Report whether the session is authorized. Never touches the platform.
pub struct IsUserAuthorizedHandler;

#[async_trait]
impl MethodHandler for IsUserAuthorizedHandler {
    #[instrument(skip_all, fields(method = "is_user_authorized"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let NoParams {} = bind_params(params)?;
        Ok(Value::Bool(session.is_authorized()))
    }
}
