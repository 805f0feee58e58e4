//! The authorized platform session.
//!
//! One [`Session`] exists per process and is shared by `Arc`. It owns the
//! transport, the artifact store, and the lifecycle state:
//!
//! ```text
//! Connecting ──► Authorized ──► Disconnected
//!      └──────────────────────────────┘
//! ```
//!
//! `Disconnected` is terminal. State lives in a `watch` channel so the
//! process main loop can await it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::credentials::Credentials;
use crate::errors::{PlatformError, SessionError};
use crate::store::{SessionArtifact, SessionStore};
use crate::transport::Transport;
use crate::types::{ChatAction, Chat, Entity, Message, MessageId, ParseMode, User};

/// Lifecycle state of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, authorization not finished.
    Connecting,
    /// Ready for capability calls.
    Authorized,
    /// Torn down. Terminal.
    Disconnected,
}

impl SessionState {
    /// Lowercase name, as reported by health checks.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authorized => "authorized",
            Self::Disconnected => "disconnected",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Authorized | Self::Disconnected)
                | (Self::Authorized, Self::Disconnected)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`Session::send_message`].
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    /// Markup mode for the text.
    pub parse_mode: Option<ParseMode>,
    /// Deliver without a notification sound.
    pub silent: bool,
    /// Message id to reply to.
    pub reply_to: Option<i64>,
    /// Suppress link previews.
    pub no_link_preview: bool,
}

/// Profile fields to change. Absent fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Short "about" text.
    pub about: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    /// Whether nothing would change.
    pub fn is_empty(&self) -> bool {
        self.about.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }

    /// Full display name, keeping whichever half of `current` is not being
    /// changed. `None` when neither name field is set.
    fn display_name(&self, current: Option<&User>) -> Option<String> {
        if self.first_name.is_none() && self.last_name.is_none() {
            return None;
        }
        let first = self
            .first_name
            .as_deref()
            .or_else(|| current.map(|u| u.first_name.as_str()));
        let last = self
            .last_name
            .as_deref()
            .or_else(|| current.and_then(|u| u.last_name.as_deref()));
        let parts: Vec<&str> = [first, last]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        Some(parts.join(" "))
    }
}

/// The process-wide platform session.
pub struct Session {
    transport: Arc<dyn Transport>,
    store: SessionStore,
    identity_hint: Option<String>,
    state: watch::Sender<SessionState>,
    artifact: Mutex<Option<SessionArtifact>>,
    closing: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session in the `Connecting` state.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: SessionStore,
        identity_hint: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            transport,
            store,
            identity_hint,
            state,
            artifact: Mutex::new(None),
            closing: AtomicBool::new(false),
        }
    }

    /// Create and authorize a session in one step.
    pub async fn start(
        transport: Arc<dyn Transport>,
        credentials: &Credentials,
        store: SessionStore,
    ) -> Result<Arc<Self>, SessionError> {
        let session = Arc::new(Self::new(
            transport,
            store,
            credentials.phone_number().map(str::to_owned),
        ));
        let _ = session.authorize().await?;
        Ok(session)
    }

    /// Authorize against the platform and persist the artifact.
    ///
    /// Any failure moves the session to `Disconnected`.
    #[instrument(skip(self), fields(store = %self.store.path().display()))]
    pub async fn authorize(&self) -> Result<User, SessionError> {
        let current = self.state();
        if current != SessionState::Connecting {
            return Err(SessionError::InvalidState(current, "authorize"));
        }

        match self.authorize_inner().await {
            Ok(account) => {
                let _ = self.transition(SessionState::Authorized);
                info!(
                    account_id = account.id,
                    username = account.username.as_deref().unwrap_or(""),
                    "session authorized"
                );
                Ok(account)
            }
            Err(e) => {
                warn!(error = %e, "session authorization failed");
                let _ = self.transition(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn authorize_inner(&self) -> Result<User, SessionError> {
        let previous = self.store.load().await?;

        let raw = self
            .transport
            .call("getMe", json!({}))
            .await
            .map_err(SessionError::Authorization)?;
        let account: User = serde_json::from_value(raw).map_err(|e| {
            SessionError::Authorization(PlatformError::Decode(format!("getMe: {e}")))
        })?;

        let artifact = match previous {
            Some(mut prev) if prev.account.id == account.id => {
                prev.account = account.clone();
                prev.updated_at = Utc::now();
                if self.identity_hint.is_some() {
                    prev.identity_hint.clone_from(&self.identity_hint);
                }
                prev
            }
            Some(prev) => {
                warn!(
                    previous = prev.account.id,
                    current = account.id,
                    "credentials now authorize a different account"
                );
                SessionArtifact::new(account.clone(), self.identity_hint.clone())
            }
            None => SessionArtifact::new(account.clone(), self.identity_hint.clone()),
        };

        self.store.save(&artifact).await?;
        *self.artifact.lock() = Some(artifact);
        Ok(account)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Whether capability calls are currently allowed.
    pub fn is_authorized(&self) -> bool {
        self.state() == SessionState::Authorized
    }

    /// The authorized account, if any.
    pub fn account(&self) -> Option<User> {
        self.artifact.lock().as_ref().map(|a| a.account.clone())
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn transition(&self, next: SessionState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });
        if changed {
            info!(state = %next, "session state changed");
        }
        changed
    }

    /// Tear the session down. Safe to call more than once.
    pub async fn disconnect(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            self.wait_disconnected().await;
            return;
        }

        let artifact = self.artifact.lock().clone();
        if let Some(mut artifact) = artifact {
            artifact.updated_at = Utc::now();
            if let Err(e) = self.store.save(&artifact).await {
                warn!(error = %e, "failed to persist session artifact on disconnect");
            }
        }

        self.transport.close().await;
        let _ = self.transition(SessionState::Disconnected);
    }

    /// Resolve once the session reaches `Disconnected`.
    pub async fn wait_disconnected(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| *s == SessionState::Disconnected).await;
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
    ) -> Result<T, PlatformError> {
        if !self.is_authorized() {
            return Err(PlatformError::NotAuthorized);
        }

        match self.transport.call(method, without_nulls(payload)).await {
            Ok(raw) => serde_json::from_value(raw)
                .map_err(|e| PlatformError::Decode(format!("{method}: {e}"))),
            Err(e) => {
                if e.is_unauthorized() {
                    warn!(method, "platform revoked the session");
                    let _ = self.transition(SessionState::Disconnected);
                }
                Err(e)
            }
        }
    }

    // ── Capabilities ────────────────────────────────────────────────────

    /// Fetch the authorized account from the platform.
    pub async fn get_me(&self) -> Result<User, PlatformError> {
        let me: User = self.invoke("getMe", json!({})).await?;
        if let Some(artifact) = self.artifact.lock().as_mut() {
            artifact.account = me.clone();
        }
        Ok(me)
    }

    /// Resolve a chat by id or username.
    pub async fn get_entity(&self, entity: &Entity) -> Result<Chat, PlatformError> {
        self.invoke("getChat", json!({ "chat_id": entity })).await
    }

    /// Number of members in a chat.
    pub async fn get_participant_count(&self, entity: &Entity) -> Result<i64, PlatformError> {
        self.invoke("getChatMemberCount", json!({ "chat_id": entity }))
            .await
    }

    /// Send a text message.
    pub async fn send_message(
        &self,
        entity: &Entity,
        text: &str,
        options: &SendOptions,
    ) -> Result<Message, PlatformError> {
        let payload = json!({
            "chat_id": entity,
            "text": text,
            "parse_mode": options.parse_mode,
            "disable_notification": options.silent.then_some(true),
            "reply_parameters": options.reply_to.map(|id| json!({ "message_id": id })),
            "link_preview_options": options
                .no_link_preview
                .then(|| json!({ "is_disabled": true })),
        });
        self.invoke("sendMessage", payload).await
    }

    /// Replace the text of a sent message.
    pub async fn edit_message(
        &self,
        entity: &Entity,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<Message, PlatformError> {
        let payload = json!({
            "chat_id": entity,
            "message_id": message_id,
            "text": text,
            "parse_mode": parse_mode,
        });
        self.invoke("editMessageText", payload).await
    }

    /// Delete messages from a chat.
    pub async fn delete_messages(
        &self,
        entity: &Entity,
        message_ids: &[i64],
    ) -> Result<bool, PlatformError> {
        let payload = json!({ "chat_id": entity, "message_ids": message_ids });
        self.invoke("deleteMessages", payload).await
    }

    /// Forward messages between chats.
    pub async fn forward_messages(
        &self,
        to: &Entity,
        from: &Entity,
        message_ids: &[i64],
        silent: bool,
    ) -> Result<Vec<MessageId>, PlatformError> {
        let payload = json!({
            "chat_id": to,
            "from_chat_id": from,
            "message_ids": message_ids,
            "disable_notification": silent.then_some(true),
        });
        self.invoke("forwardMessages", payload).await
    }

    /// Pin a message.
    pub async fn pin_message(
        &self,
        entity: &Entity,
        message_id: i64,
        silent: bool,
    ) -> Result<bool, PlatformError> {
        let payload = json!({
            "chat_id": entity,
            "message_id": message_id,
            "disable_notification": silent.then_some(true),
        });
        self.invoke("pinChatMessage", payload).await
    }

    /// Unpin one message, or every pinned message when `message_id` is `None`.
    pub async fn unpin_message(
        &self,
        entity: &Entity,
        message_id: Option<i64>,
    ) -> Result<bool, PlatformError> {
        match message_id {
            Some(id) => {
                self.invoke("unpinChatMessage", json!({ "chat_id": entity, "message_id": id }))
                    .await
            }
            None => {
                self.invoke("unpinAllChatMessages", json!({ "chat_id": entity }))
                    .await
            }
        }
    }

    /// Show a chat action such as "typing".
    pub async fn send_action(
        &self,
        entity: &Entity,
        action: ChatAction,
    ) -> Result<bool, PlatformError> {
        self.invoke("sendChatAction", json!({ "chat_id": entity, "action": action }))
            .await
    }

    /// Change the account's public profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), PlatformError> {
        if let Some(about) = &update.about {
            let _: bool = self
                .invoke("setMyShortDescription", json!({ "short_description": about }))
                .await?;
        }
        let current = self.account();
        if let Some(name) = update.display_name(current.as_ref()) {
            let _: bool = self.invoke("setMyName", json!({ "name": name })).await?;
            if let Some(artifact) = self.artifact.lock().as_mut() {
                if let Some(first) = &update.first_name {
                    artifact.account.first_name.clone_from(first);
                }
                if let Some(last) = &update.last_name {
                    artifact.account.last_name = Some(last.clone()).filter(|l| !l.is_empty());
                }
            }
        }
        Ok(())
    }
}

/// Drop top-level `null` members so optional parameters are simply absent.
fn without_nulls(payload: Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
