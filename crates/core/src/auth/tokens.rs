//! OAuth token set and its persistence

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Tokens expiring within this window are refreshed before use
const REFRESH_WINDOW_SECS: i64 = 300;

/// Name of the token file inside the token folder
const TOKEN_FILE: &str = "token.json";

/// OAuth 2.0 token set
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl OAuthTokens {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
            scope: None,
            token_type: None,
        }
    }

    /// Expired, or expiring within the refresh window
    pub fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(REFRESH_WINDOW_SECS)
    }
}

impl std::fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Where the session's tokens survive between runs
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<OAuthTokens>>;
    async fn save(&self, tokens: &OAuthTokens) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Token persisted as JSON in `<token_dir>/token.json`
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(token_dir: impl AsRef<Path>) -> Self {
        Self {
            path: token_dir.as_ref().join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<OAuthTokens>> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => {
                let tokens = serde_json::from_slice(&content)?;
                debug!("Loaded token from {}", self.path.display());
                Ok(Some(tokens))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn save(&self, tokens: &OAuthTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(tokens)?).await?;

        // Read/write for owner only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Process-local store, for callers that do not persist tokens
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<OAuthTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: OAuthTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<OAuthTokens>>> {
        self.tokens
            .lock()
            .map_err(|_| Error::Other("Token store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<OAuthTokens>> {
        Ok(self.slot()?.clone())
    }

    async fn save(&self, tokens: &OAuthTokens) -> Result<()> {
        *self.slot()? = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
