//! Message handlers.
//!
//! Parameter names follow what existing bridge callers already send:
//! `entity` for the target chat and `message` for the text (or, when editing
//! or pinning, the message id).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::{Encode, Value};
use tgrelay_session::{Entity, ParseMode, SendOptions, Session};
use tracing::instrument;

use crate::rpc::errors::RpcError;
use crate::rpc::handlers::{OneOrMany, bind_params};
use crate::rpc::registry::MethodHandler;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SendMessageParams {
    entity: Entity,
    message: String,
    #[serde(default)]
    reply_to: Option<i64>,
    #[serde(default)]
    parse_mode: Option<ParseMode>,
    #[serde(default = "default_true")]
    link_preview: bool,
    #[serde(default)]
    silent: bool,
}

/// Send a text message.
pub struct SendMessageHandler;

#[async_trait]
impl MethodHandler for SendMessageHandler {
    #[instrument(skip_all, fields(method = "send_message"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: SendMessageParams = bind_params(params)?;
        if p.message.is_empty() {
            return Err(RpcError::invalid_params("The message cannot be empty"));
        }
        let options = SendOptions {
            parse_mode: p.parse_mode,
            silent: p.silent,
            reply_to: p.reply_to,
            no_link_preview: !p.link_preview,
        };
        let sent = session.send_message(&p.entity, &p.message, &options).await?;
        Ok(sent.to_value())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditMessageParams {
    entity: Entity,
    message: i64,
    text: String,
    #[serde(default)]
    parse_mode: Option<ParseMode>,
}

/// Replace the text of a sent message.
pub struct EditMessageHandler;

#[async_trait]
impl MethodHandler for EditMessageHandler {
    #[instrument(skip_all, fields(method = "edit_message"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: EditMessageParams = bind_params(params)?;
        let edited = session
            .edit_message(&p.entity, p.message, &p.text, p.parse_mode)
            .await?;
        Ok(edited.to_value())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteMessagesParams {
    entity: Entity,
    message_ids: OneOrMany,
}

/// Delete one or more messages.
pub struct DeleteMessagesHandler;

#[async_trait]
impl MethodHandler for DeleteMessagesHandler {
    #[instrument(skip_all, fields(method = "delete_messages"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: DeleteMessagesParams = bind_params(params)?;
        let ids = p.message_ids.as_slice();
        if ids.is_empty() {
            return Err(RpcError::invalid_params("message_ids must not be empty"));
        }
        Ok(Value::Bool(session.delete_messages(&p.entity, ids).await?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForwardMessagesParams {
    entity: Entity,
    messages: OneOrMany,
    from_peer: Entity,
    #[serde(default)]
    silent: bool,
}

/// Forward messages into another chat.
///
/// A single id in gives a single record back; a list gives a list.
pub struct ForwardMessagesHandler;

#[async_trait]
impl MethodHandler for ForwardMessagesHandler {
    #[instrument(skip_all, fields(method = "forward_messages"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: ForwardMessagesParams = bind_params(params)?;
        let forwarded = session
            .forward_messages(&p.entity, &p.from_peer, p.messages.as_slice(), p.silent)
            .await?;
        Ok(match p.messages {
            OneOrMany::One(_) => forwarded.first().to_value(),
            OneOrMany::Many(_) => forwarded.to_value(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PinMessageParams {
    entity: Entity,
    message: i64,
    #[serde(default)]
    notify: bool,
}

/// Pin a message.
pub struct PinMessageHandler;

#[async_trait]
impl MethodHandler for PinMessageHandler {
    #[instrument(skip_all, fields(method = "pin_message"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: PinMessageParams = bind_params(params)?;
        Ok(Value::Bool(
            session.pin_message(&p.entity, p.message, !p.notify).await?,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnpinMessageParams {
    entity: Entity,
    #[serde(default)]
    message: Option<i64>,
}

/// Unpin one message, or all of them when no id is given.
pub struct UnpinMessageHandler;

#[async_trait]
impl MethodHandler for UnpinMessageHandler {
    #[instrument(skip_all, fields(method = "unpin_message"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let p: UnpinMessageParams = bind_params(params)?;
        Ok(Value::Bool(session.unpin_message(&p.entity, p.message).await?))
    }
}
