//! Session lifecycle against a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tgrelay_session::testing::{ScriptedTransport, text_message};
use tgrelay_session::{
    Credentials, Entity, PlatformError, ProfileUpdate, SendOptions, Session, SessionError,
    SessionState, SessionStore,
};

fn store(dir: &tempfile::TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("tg_session.json"))
}

fn credentials() -> Credentials {
    Credentials::new(Some("1"), Some("secret"), Some("+15550100")).unwrap()
}

#[tokio::test]
async fn start_authorizes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());

    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Authorized);
    assert_eq!(session.account().unwrap().id, 424_242);

    let artifact = store(&dir).load().await.unwrap().unwrap();
    assert_eq!(artifact.account.username.as_deref(), Some("relay_bot"));
    assert_eq!(artifact.identity_hint.as_deref(), Some("+15550100"));
}

#[tokio::test]
async fn restart_keeps_original_authorization_time() {
    let dir = tempfile::tempdir().unwrap();
    let first = Session::start(
        Arc::new(ScriptedTransport::authorized()),
        &credentials(),
        store(&dir),
    )
    .await
    .unwrap();
    first.disconnect().await;
    let before = store(&dir).load().await.unwrap().unwrap();

    let _second = Session::start(
        Arc::new(ScriptedTransport::authorized()),
        &credentials(),
        store(&dir),
    )
    .await
    .unwrap();
    let after = store(&dir).load().await.unwrap().unwrap();

    assert_eq!(after.authorized_at, before.authorized_at);
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn rejected_credentials_end_disconnected() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    transport.fail("getMe", 401, "Unauthorized");
    let session = Session::new(transport, store(&dir), None);

    let err = session.authorize().await.unwrap_err();

    assert_matches!(err, SessionError::Authorization(PlatformError::Api { code: 401, .. }));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(store(&dir).load().await.unwrap().is_none());
}

#[tokio::test]
async fn capabilities_require_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    let session = Session::new(transport.clone(), store(&dir), None);

    let err = session
        .send_message(&Entity::Id(1), "hi", &SendOptions::default())
        .await
        .unwrap_err();

    assert_matches!(err, PlatformError::NotAuthorized);
    assert!(transport.calls_to("sendMessage").is_empty());
}

#[tokio::test]
async fn send_message_builds_payload_without_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.ok("sendMessage", text_message(99, 5, "hello"));
    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    let options = SendOptions {
        silent: true,
        reply_to: Some(3),
        ..Default::default()
    };
    let msg = session
        .send_message(&Entity::parse("@peer"), "hello", &options)
        .await
        .unwrap();

    assert_eq!(msg.message_id, 5);
    assert_eq!(
        transport.calls_to("sendMessage"),
        vec![json!({
            "chat_id": "@peer",
            "text": "hello",
            "disable_notification": true,
            "reply_parameters": {"message_id": 3}
        })]
    );
}

#[tokio::test]
async fn revoked_credentials_disconnect_mid_call() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.fail("getChat", 401, "Unauthorized");
    let session = Session::start(transport, &credentials(), store(&dir))
        .await
        .unwrap();

    let err = session.get_entity(&Entity::Id(1)).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(session.state(), SessionState::Disconnected);
    tokio::time::timeout(Duration::from_secs(1), session.wait_disconnected())
        .await
        .unwrap();
}

#[tokio::test]
async fn other_platform_errors_keep_session_alive() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.fail("sendMessage", 403, "Forbidden: bot was blocked by the user");
    let session = Session::start(transport, &credentials(), store(&dir))
        .await
        .unwrap();

    let err = session
        .send_message(&Entity::Id(7), "x", &SendOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Forbidden: bot was blocked by the user");
    assert_eq!(session.state(), SessionState::Authorized);
}

#[tokio::test]
async fn disconnect_is_idempotent_and_wakes_waiters() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    let waiter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.wait_disconnected().await })
    };

    session.disconnect().await;
    session.disconnect().await;

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(transport.is_closed());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_matches!(
        session.authorize().await,
        Err(SessionError::InvalidState(SessionState::Disconnected, _))
    );
}

#[tokio::test]
async fn update_profile_maps_fields_to_platform_calls() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.ok("setMyShortDescription", json!(true));
    transport.ok("setMyName", json!(true));
    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    session
        .update_profile(&ProfileUpdate {
            about: Some("new bio".into()),
            first_name: Some("Relay".into()),
            last_name: Some("Bot".into()),
        })
        .await
        .unwrap();

    assert_eq!(
        transport.calls_to("setMyShortDescription"),
        vec![json!({"short_description": "new bio"})]
    );
    assert_eq!(transport.calls_to("setMyName"), vec![json!({"name": "Relay Bot"})]);
}

#[tokio::test]
async fn partial_name_update_keeps_the_other_half() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.ok("setMyName", json!(true));
    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    session
        .update_profile(&ProfileUpdate {
            last_name: Some("Bot".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    session
        .update_profile(&ProfileUpdate {
            first_name: Some("Relay2".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

    assert_eq!(
        transport.calls_to("setMyName"),
        vec![json!({"name": "Relay Bot"}), json!({"name": "Relay2 Bot"})]
    );
    assert!(transport.calls_to("setMyShortDescription").is_empty());
    let account = session.account().unwrap();
    assert_eq!(account.first_name, "Relay2");
    assert_eq!(account.last_name.as_deref(), Some("Bot"));
}

#[tokio::test]
async fn unpin_without_id_unpins_all() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::authorized());
    transport.ok("unpinAllChatMessages", json!(true));
    let session = Session::start(transport.clone(), &credentials(), store(&dir))
        .await
        .unwrap();

    assert!(session.unpin_message(&Entity::Id(-100), None).await.unwrap());
    assert_eq!(
        transport.calls_to("unpinAllChatMessages"),
        vec![json!({"chat_id": -100})]
    );
}
