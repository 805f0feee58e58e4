//! End-to-end: real listener, real HTTP client, scripted platform.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};
use tgrelay_core::Value;
use tgrelay_server::rpc::errors::RpcError;
use tgrelay_server::{
    Dispatcher, MethodHandler, RelayServer, ServerConfig, ServerHandle, default_registry,
};
use tgrelay_session::testing::{ScriptedTransport, text_message};
use tgrelay_session::{Session, SessionStore};

struct Bridge {
    server: RelayServer,
    handle: ServerHandle,
    transport: Arc<ScriptedTransport>,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl Bridge {
    async fn start() -> Self {
        Self::start_with(default_registry()).await
    }

    async fn start_with(registry: tgrelay_server::MethodRegistry) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::authorized());
        let session = Session::new(
            transport.clone(),
            SessionStore::new(dir.path().join("tg_session.json")),
            None,
        );
        let _ = session.authorize().await.unwrap();

        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(session));
        let server = RelayServer::new(ServerConfig::default(), dispatcher);
        let handle = server.listen().await.unwrap();

        Self {
            server,
            handle,
            transport,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    async fn call(&self, body: JsonValue) -> (u16, JsonValue) {
        let resp = self
            .client
            .post(format!("http://{}/api/call", self.handle.addr()))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn stop(self) {
        let _ = self.server.drain(self.handle).await;
    }
}

#[tokio::test]
async fn update_profile_with_about() {
    let bridge = Bridge::start().await;
    bridge.transport.ok("setMyShortDescription", json!(true));

    let (status, body) = bridge
        .call(json!({"method": "update_profile", "params": {"about": "new bio"}}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"status": "success", "result": "Profile updated successfully"})
    );
    bridge.stop().await;
}

#[tokio::test]
async fn update_profile_without_fields_skips_platform() {
    let bridge = Bridge::start().await;
    let calls_before = bridge.transport.calls().len();

    let (status, body) = bridge
        .call(json!({"method": "update_profile", "params": {}}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        body["result"],
        "No valid parameters provided (about, first_name, last_name)"
    );
    assert_eq!(bridge.transport.calls().len(), calls_before);
    bridge.stop().await;
}

#[tokio::test]
async fn missing_method_is_400() {
    let bridge = Bridge::start().await;
    let (status, body) = bridge.call(json!({})).await;

    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({"status": "error", "error": "Method name is required"})
    );
    bridge.stop().await;
}

#[tokio::test]
async fn unknown_method_is_404() {
    let bridge = Bridge::start().await;
    let (status, body) = bridge.call(json!({"method": "no_such_operation"})).await;

    assert_eq!(status, 404);
    assert_eq!(
        body,
        json!({"status": "error", "error": "Method 'no_such_operation' not found"})
    );
    bridge.stop().await;
}

#[tokio::test]
async fn send_message_returns_record_with_iso_date() {
    let bridge = Bridge::start().await;
    bridge
        .transport
        .ok("sendMessage", text_message(99, 321, "hello"));

    let (status, body) = bridge
        .call(json!({"method": "send_message", "params": {"entity": 99, "message": "hello"}}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    let result = &body["result"];
    assert_eq!(result["_"], "Message");
    assert_eq!(result["id"], 321);

    let date = chrono::DateTime::parse_from_rfc3339(result["date"].as_str().unwrap()).unwrap();
    assert_eq!(date.timestamp(), 1_700_000_000);

    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys[0], "_");
    bridge.stop().await;
}

#[tokio::test]
async fn send_message_permission_error_is_500_with_platform_text() {
    let bridge = Bridge::start().await;
    bridge
        .transport
        .fail("sendMessage", 403, "Forbidden: bot was blocked by the user");

    let (status, body) = bridge
        .call(json!({"method": "send_message", "params": {"entity": 5, "message": "x"}}))
        .await;

    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({"status": "error", "error": "Forbidden: bot was blocked by the user"})
    );
    bridge.stop().await;
}

#[tokio::test]
async fn bridge_survives_failures() {
    let bridge = Bridge::start().await;
    bridge.transport.fail("getChat", 400, "Bad Request: chat not found");

    let (status, _) = bridge
        .call(json!({"method": "get_entity", "params": {"entity": "@ghost"}}))
        .await;
    assert_eq!(status, 500);
    let (status, _) = bridge.call(json!({"method": "nope"})).await;
    assert_eq!(status, 404);

    let (status, body) = bridge.call(json!({"method": "is_user_authorized"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"], true);
    bridge.stop().await;
}

struct Shadow;

#[async_trait]
impl MethodHandler for Shadow {
    async fn handle(
        &self,
        _params: Map<String, JsonValue>,
        _session: &Session,
    ) -> Result<Value, RpcError> {
        Ok(Value::from("custom wins"))
    }
}

#[tokio::test]
async fn custom_handler_shadows_capability() {
    let mut registry = default_registry();
    registry.register_custom("send_message", Shadow);
    let bridge = Bridge::start_with(registry).await;

    let (status, body) = bridge
        .call(json!({"method": "send_message", "params": {"entity": 1, "message": "x"}}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["result"], "custom wins");
    assert!(bridge.transport.calls_to("sendMessage").is_empty());
    bridge.stop().await;
}

#[tokio::test]
async fn non_object_body_is_500() {
    let bridge = Bridge::start().await;
    let resp = bridge
        .client
        .post(format!("http://{}/api/call", bridge.handle.addr()))
        .body("[1,2,3]")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    let body: JsonValue = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    bridge.stop().await;
}
