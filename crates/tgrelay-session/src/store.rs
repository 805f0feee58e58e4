//! Persisted session artifact.
//!
//! One JSON file per session name. It records which account the credentials
//! authorized as, so a restart can detect a credential swap. Writes go to a
//! sibling temp file first and are renamed into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::SessionError;
use crate::types::User;

/// Current artifact format version.
pub const ARTIFACT_VERSION: u32 = 1;

/// Contents of the session file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionArtifact {
    /// Format version.
    pub version: u32,
    /// The authorized account.
    pub account: User,
    /// When the account was first authorized.
    pub authorized_at: DateTime<Utc>,
    /// Last time the artifact was written.
    pub updated_at: DateTime<Utc>,
    /// Identity hint the session was created with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_hint: Option<String>,
}

impl SessionArtifact {
    /// Fresh artifact for a newly authorized account.
    pub fn new(account: User, identity_hint: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            version: ARTIFACT_VERSION,
            account,
            authorized_at: now,
            updated_at: now,
            identity_hint,
        }
    }
}

/// File-backed artifact store.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the artifact.
    ///
    /// A missing file is `Ok(None)`. A file from a newer format version is
    /// ignored with a warning.
    pub async fn load(&self) -> Result<Option<SessionArtifact>, SessionError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no session artifact");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let artifact: SessionArtifact = serde_json::from_slice(&content)?;
        if artifact.version > ARTIFACT_VERSION {
            warn!(
                path = %self.path.display(),
                version = artifact.version,
                "session artifact from a newer version, ignoring"
            );
            return Ok(None);
        }
        Ok(Some(artifact))
    }

    /// Write the artifact, creating the parent directory as needed.
    pub async fn save(&self, artifact: &SessionArtifact) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(artifact)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), account = artifact.account.id, "session artifact saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn account() -> User {
        User {
            id: 77,
            is_bot: true,
            first_name: "Relay".into(),
            last_name: None,
            username: Some("relay_bot".into()),
            language_code: None,
        }
    }

    #[tokio::test]
    async fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_dir_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/sessions/tg_session.json"));
        let artifact = SessionArtifact::new(account(), Some("+1555".into()));

        store.save(&artifact).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, artifact);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn artifact_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("s.json"));
        store.save(&SessionArtifact::new(account(), None)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert!(raw.get("authorizedAt").is_some());
        assert!(raw.get("identityHint").is_none());
    }

    #[tokio::test]
    async fn newer_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("s.json"));
        let mut artifact = SessionArtifact::new(account(), None);
        artifact.version = ARTIFACT_VERSION + 1;
        store.save(&artifact).await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{broken").unwrap();

        let err = SessionStore::new(path).load().await.unwrap_err();
        assert_matches!(err, SessionError::StoreFormat(_));
    }
}
