//! OAuth 2.0 authorization code flow with PKCE against Google's endpoints

use super::secrets::ClientSecrets;
use super::tokens::OAuthTokens;
use crate::error::{AuthorizationError, Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Full read/write access to the user's Drive
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// PKCE code verifier plus the CSRF state sent with the consent request
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        // 32 random bytes encode to the 43 characters RFC 7636 asks for at minimum
        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        Self {
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
            state: URL_SAFE_NO_PAD.encode(state_bytes),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// S256 challenge: BASE64URL(SHA256(verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    fn into_tokens(self, previous_refresh_token: Option<&str>) -> OAuthTokens {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string));

        let mut tokens = OAuthTokens::new(self.access_token, refresh_token, self.expires_in);
        tokens.scope = self.scope;
        tokens.token_type = self.token_type;
        tokens
    }
}

/// Builds consent URLs and talks to the token endpoint
pub struct OAuthFlow {
    secrets: ClientSecrets,
    http_client: Client,
}

impl OAuthFlow {
    pub fn new(secrets: ClientSecrets, http_client: Client) -> Self {
        Self {
            secrets,
            http_client,
        }
    }

    /// Consent URL for `redirect_uri`, and the verifier the exchange needs later
    #[instrument(skip(self))]
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();

        let mut url = Url::parse(&self.secrets.auth_uri)
            .map_err(|e| Error::InvalidConfig(format!("Invalid auth URI: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", DRIVE_SCOPE)
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &verifier.challenge())
            .append_pair("code_challenge_method", "S256")
            // Ask for a refresh token, and again on every consent
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok((url.to_string(), verifier))
    }

    /// Trade an authorization code for tokens
    #[instrument(skip(self, code, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.secrets.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(secret) = &self.secrets.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");
        let response = self.token_request(&params).await.map_err(|message| {
            warn!("Token exchange failed: {}", message);
            AuthorizationError::Denied(message)
        })?;

        info!("Obtained tokens (expires in {}s)", response.expires_in);
        Ok(response.into_tokens(None))
    }

    /// New access token from the refresh token; the refresh token is kept
    /// unless Google rotates it
    #[instrument(skip(self, tokens))]
    pub async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or(AuthorizationError::MissingRefreshToken)?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
        ];
        if let Some(secret) = &self.secrets.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!("Refreshing access token");
        let response = self
            .token_request(&params)
            .await
            .map_err(AuthorizationError::RefreshFailed)?;

        info!("Refreshed access token (expires in {}s)", response.expires_in);
        Ok(response.into_tokens(Some(refresh_token)))
    }

    /// POST a form to the token endpoint; failures come back as a message
    async fn token_request(&self, params: &[(&str, &str)]) -> std::result::Result<TokenResponse, String> {
        let response = self
            .http_client
            .post(&self.secrets.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Token endpoint returned {}: {}", status.as_u16(), body));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("Unreadable token response: {}", e))
    }
}
