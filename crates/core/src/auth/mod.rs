//! Google OAuth for installed applications
//!
//! [`Authenticator`] is what the client facade talks to. The default
//! implementation, [`InstalledFlow`], reads the client secrets, sends the
//! user to Google's consent page and catches the redirect on a loopback
//! port.

mod flow;
mod receiver;
mod secrets;
mod tokens;

pub use flow::{OAuthFlow, PkceVerifier, DRIVE_SCOPE};
pub use receiver::{parse_callback, Callback, LoopbackListener};
pub use secrets::ClientSecrets;
pub use tokens::{FileTokenStore, MemoryTokenStore, OAuthTokens, TokenStore};

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Callback receiving the consent URL the user has to open
pub type ConsentPrompt = Arc<dyn Fn(&str) + Send + Sync>;

/// Obtains and renews OAuth tokens
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the interactive consent flow
    async fn authorize(&self) -> Result<OAuthTokens>;

    /// Exchange the refresh token for a new access token
    async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens>;
}

/// Installed-app flow: consent in the browser, redirect to 127.0.0.1
pub struct InstalledFlow {
    credentials_path: PathBuf,
    redirect_port: u16,
    http_client: Client,
    prompt: Option<ConsentPrompt>,
    flow: OnceCell<OAuthFlow>,
}

impl InstalledFlow {
    pub fn new(credentials_path: impl Into<PathBuf>, redirect_port: u16) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            redirect_port,
            http_client: Client::new(),
            prompt: None,
            flow: OnceCell::new(),
        }
    }

    /// Show the consent URL some other way than the log
    pub fn with_prompt(mut self, prompt: ConsentPrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Secrets are read on first use
    async fn flow(&self) -> Result<&OAuthFlow> {
        self.flow
            .get_or_try_init(|| async {
                let secrets = ClientSecrets::from_file(&self.credentials_path)?;
                Ok::<_, Error>(OAuthFlow::new(secrets, self.http_client.clone()))
            })
            .await
    }
}

#[async_trait]
impl Authenticator for InstalledFlow {
    async fn authorize(&self) -> Result<OAuthTokens> {
        let flow = self.flow().await?;
        let listener = LoopbackListener::bind(self.redirect_port).await?;
        let redirect_uri = listener.redirect_uri().to_string();
        let (consent_url, verifier) = flow.authorization_url(&redirect_uri)?;

        match &self.prompt {
            Some(prompt) => prompt(&consent_url),
            None => info!("Open this URL in a browser to authorize: {}", consent_url),
        }

        let code = listener.wait_for_code(verifier.state()).await?;
        flow.exchange_code(&code, &redirect_uri, &verifier).await
    }

    async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        self.flow().await?.refresh(tokens).await
    }
}
