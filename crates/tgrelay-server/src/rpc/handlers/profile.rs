//! `update_profile`: the one bridge-defined handler.
//!
//! Only `about`, `first_name` and `last_name` are read; any other key is
//! ignored. With none of them present the handler answers with a message
//! and makes no platform call.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tgrelay_core::Value;
use tgrelay_session::{ProfileUpdate, Session};
use tracing::{error, instrument};

use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;

/// Whitelisted profile fields.
pub const PROFILE_FIELDS: [&str; 3] = ["about", "first_name", "last_name"];

/// Returned when no whitelisted field is present.
pub const NO_VALID_PARAMS: &str = "No valid parameters provided (about, first_name, last_name)";

/// Returned after the platform accepted the change.
pub const PROFILE_UPDATED: &str = "Profile updated successfully";

/// Update the account's public profile.
pub struct UpdateProfileHandler;

#[async_trait]
impl MethodHandler for UpdateProfileHandler {
    #[instrument(skip_all, fields(method = "update_profile"))]
    async fn handle(
        &self,
        params: Map<String, JsonValue>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        let update = profile_update(&params)?;
        if update.is_empty() {
            return Ok(Value::from(NO_VALID_PARAMS));
        }

        session.update_profile(&update).await.map_err(|e| {
            error!(error = %e, "error in update_profile");
            RpcError::from(e)
        })?;
        Ok(Value::from(PROFILE_UPDATED))
    }
}

/// Pick the whitelisted fields out of `params`. `null` counts as absent.
fn profile_update(params: &Map<String, JsonValue>) -> Result<ProfileUpdate, RpcError> {
    let field = |name: &str| -> Result<Option<String>, RpcError> {
        match params.get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(RpcError::invalid_params(format!(
                "Parameter '{name}' must be a string, got {other}"
            ))),
        }
    };

    Ok(ProfileUpdate {
        about: field(PROFILE_FIELDS[0])?,
        first_name: field(PROFILE_FIELDS[1])?,
        last_name: field(PROFILE_FIELDS[2])?,
    })
}
