//! Session credential providers
//!
//! The API client never caches the bearer credential. It asks the injected
//! [`SessionProvider`] on every call, so a credential refreshed between two
//! calls is picked up by the next one.

use crate::error::{ClientError, Result};
use crate::models::LoginResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info};

/// Source of the current bearer credential
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current credential, `None` when nobody is signed in
    async fn access_token(&self) -> Result<Option<String>>;

    /// Receiver notified whenever the credential changes
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

/// In-process credential cell
#[derive(Debug)]
pub struct MemorySession {
    tx: watch::Sender<Option<String>>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemorySession {
    pub fn new(token: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(token);
        Self { tx }
    }

    pub fn signed_in(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()))
    }

    /// Replace the credential and notify subscribers
    pub fn set_token(&self, token: impl Into<String>) {
        self.tx.send_replace(Some(token.into()));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

#[async_trait]
impl SessionProvider for MemorySession {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.tx.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

/// On-disk session record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    #[serde(default)]
    user_id: Option<String>,
    saved_at: DateTime<Utc>,
}

/// Credential persisted to a JSON file so separate CLI runs share it
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    tx: watch::Sender<Option<String>>,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            path: path.into(),
            tx,
        }
    }

    /// Default location: `~/.config/sleepwise/session.json`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir()
            .ok_or_else(|| ClientError::Session("could not determine home directory".into()))?;
        Ok(home.join(".config").join("sleepwise").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the credential returned by a login
    pub async fn store(&self, login: &LoginResponse) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Session(format!("failed to create {:?}: {}", parent, e)))?;
        }

        let record = StoredSession {
            access_token: login.access_token.clone(),
            user_id: Some(login.user_id.clone()),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| ClientError::Session(format!("failed to encode session: {}", e)))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ClientError::Session(format!("failed to write {:?}: {}", self.path, e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(|e| ClientError::Session(format!("failed to restrict {:?}: {}", self.path, e)))?;
        }

        info!(path = ?self.path, user_id = %login.user_id, "Session stored");
        self.tx.send_replace(Some(login.access_token.clone()));
        Ok(())
    }

    /// Remove the stored credential; a missing file is not an error
    pub async fn clear(&self) -> Result<bool> {
        let removed = match tokio::fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                return Err(ClientError::Session(format!(
                    "failed to remove {:?}: {}",
                    self.path, e
                )))
            }
        };
        self.tx.send_replace(None);
        Ok(removed)
    }

    /// User id recorded at login, if any
    pub async fn user_id(&self) -> Result<Option<String>> {
        Ok(self.read().await?.and_then(|record| record.user_id))
    }

    async fn read(&self) -> Result<Option<StoredSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Session(format!(
                    "failed to read {:?}: {}",
                    self.path, e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ClientError::Session(format!("corrupt session file {:?}: {}", self.path, e)))
    }
}

#[async_trait]
impl SessionProvider for FileSession {
    async fn access_token(&self) -> Result<Option<String>> {
        let token = self
            .read()
            .await?
            .map(|record| record.access_token)
            .filter(|token| !token.is_empty());

        self.tx.send_if_modified(|current| {
            if *current != token {
                debug!(signed_in = token.is_some(), "Session credential changed on disk");
                *current = token.clone();
                true
            } else {
                false
            }
        });

        Ok(token)
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
