//! Method handlers.
//!
//! Each handler binds its params map into a typed argument struct with serde.
//! Capability argument structs use `deny_unknown_fields`, so a misspelt
//! parameter is an error instead of being dropped silently.

pub mod account;
pub mod chats;
pub mod messages;
pub mod profile;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodRegistry;

/// Name of the profile custom handler.
pub const UPDATE_PROFILE: &str = "update_profile";

/// Session operations reachable from `/api/call`.
pub const CAPABILITIES: &[&str] = &[
    "get_me",
    "is_user_authorized",
    "get_entity",
    "get_participant_count",
    "send_message",
    "edit_message",
    "delete_messages",
    "forward_messages",
    "pin_message",
    "unpin_message",
    "action",
];

/// Fill a registry with the custom handler and every capability.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register_custom(UPDATE_PROFILE, profile::UpdateProfileHandler);

    registry.register_capability("get_me", account::GetMeHandler);
    registry.register_capability("is_user_authorized", account::IsUserAuthorizedHandler);
    registry.register_capability("get_entity", chats::GetEntityHandler);
    registry.register_capability("get_participant_count", chats::GetParticipantCountHandler);
    registry.register_capability("action", chats::ActionHandler);
    registry.register_capability("send_message", messages::SendMessageHandler);
    registry.register_capability("edit_message", messages::EditMessageHandler);
    registry.register_capability("delete_messages", messages::DeleteMessagesHandler);
    registry.register_capability("forward_messages", messages::ForwardMessagesHandler);
    registry.register_capability("pin_message", messages::PinMessageHandler);
    registry.register_capability("unpin_message", messages::UnpinMessageHandler);
}

/// A registry with everything registered.
pub fn default_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    register_all(&mut registry);
    registry
}

/// Deserialize a params map into a handler's argument type.
pub fn bind_params<T: DeserializeOwned>(params: Map<String, JsonValue>) -> Result<T, RpcError> {
    serde_json::from_value(JsonValue::Object(params))
        .map_err(|e| RpcError::invalid_params(format!("Invalid params: {e}")))
}

/// Argument type for operations that take none.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

/// A single message id or a list of them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// One id.
    One(i64),
    /// Several ids.
    Many(Vec<i64>),
}

impl OneOrMany {
    /// All ids as a slice.
    pub fn as_slice(&self) -> &[i64] {
        match self {
            Self::One(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;

    use tgrelay_session::testing::ScriptedTransport;
    use tgrelay_session::{Session, SessionStore};

    /// An authorized session over a scripted transport, plus the transport.
    pub async fn authorized_session() -> (Arc<Session>, Arc<ScriptedTransport>) {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::authorized());
        let session = Session::new(
            transport.clone(),
            SessionStore::new(dir.path().join("tg_session.json")),
            None,
        );
        let _ = session.authorize().await.unwrap();
        (Arc::new(session), transport)
    }

    /// Params map from a JSON object literal.
    pub fn params(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match v {
            serde_json::Value::Object(map) => map,
            other => panic!("params must be an object, got {other}"),
        }
    }
}
