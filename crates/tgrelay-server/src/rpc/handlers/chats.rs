//! Chat handlers: `get_entity`, `get_participant_count`, `action`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::{Encode, Value};
use tgrelay_session::{ChatAction, Entity, Session};
use tracing::instrument;

use crate::rpc::errors::RpcError;
use crate::rpc::handlers::bind_params;
use crate::rpc::registry::MethodHandler;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityParams {
    entity: Entity,
}

/// Resolve a chat by id or username.
pub struct GetEntityHandler;

#[async_trait]
impl MethodHandler for GetEntityHandler {
    #[instrument(skip_all, fields(method = "get_entity"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let EntityParams { entity } = bind_params(params)?;
        Ok(session.get_entity(&entity).await?.to_value())
    }
}

/// Count the members of a chat.
pub struct GetParticipantCountHandler;

#[async_trait]
impl MethodHandler for GetParticipantCountHandler {
    #[instrument(skip_all, fields(method = "get_participant_count"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let EntityParams { entity } = bind_params(params)?;
        Ok(Value::Int(session.get_participant_count(&entity).await?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionParams {
    entity: Entity,
    #[serde(default)]
    action: ChatAction,
}

/// Show a chat action ("typing", "upload_photo", ...).
pub struct ActionHandler;

#[async_trait]
impl MethodHandler for ActionHandler {
    #[instrument(skip_all, fields(method = "action"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let ActionParams { entity, action } = bind_params(params)?;
        Ok(Value::Bool(session.send_action(&entity, action).await?))
    }
}
