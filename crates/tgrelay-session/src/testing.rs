//! In-memory transport for tests.
//!
//! Each platform method gets a responder closure. Calls to methods without a
//! responder fail with a 404 API error. Every call is recorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::errors::PlatformError;
use crate::transport::Transport;

type Responder = Box<dyn Fn(&Value) -> Result<Value, PlatformError> + Send + Sync>;

/// Scripted [`Transport`] double.
#[derive(Default)]
pub struct ScriptedTransport {
    responders: Mutex<HashMap<String, Responder>>,
    calls: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script with `getMe` answering [`bot_account`].
    pub fn authorized() -> Self {
        let transport = Self::new();
        transport.ok("getMe", bot_account());
        transport
    }

    /// Install a responder for `method`, replacing any previous one.
    pub fn respond<F>(&self, method: &str, f: F)
    where
        F: Fn(&Value) -> Result<Value, PlatformError> + Send + Sync + 'static,
    {
        let _ = self.responders.lock().insert(method.to_owned(), Box::new(f));
    }

    /// Always answer `method` with `result`.
    pub fn ok(&self, method: &str, result: Value) {
        self.respond(method, move |_| Ok(result.clone()));
    }

    /// Always reject `method` with an API error.
    pub fn fail(&self, method: &str, code: i64, description: &str) {
        let description = description.to_owned();
        self.respond(method, move |_| Err(PlatformError::api(code, description.clone())));
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Payloads sent to `method`, in order.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, payload: Value) -> Result<Value, PlatformError> {
        let result = match self.responders.lock().get(method) {
            Some(responder) => responder(&payload),
            None => Err(PlatformError::api(404, "Not Found")),
        };
        self.calls.lock().push((method.to_owned(), payload));
        result
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A bot account as `getMe` returns it.
pub fn bot_account() -> Value {
    json!({
        "id": 424_242,
        "is_bot": true,
        "first_name": "Relay",
        "username": "relay_bot"
    })
}

/// A text message as `sendMessage` returns it.
pub fn text_message(chat_id: i64, message_id: i64, text: &str) -> Value {
    json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": {"id": chat_id, "type": "private", "first_name": "Peer"},
        "from": bot_account(),
        "text": text
    })
}
