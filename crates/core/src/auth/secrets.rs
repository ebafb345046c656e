//! OAuth client secrets as downloaded from the Google Cloud console

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials for an installed (desktop) application
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Layout of `credentials.json`: one of the two sections is present
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecrets {
    /// Parse the JSON content of a credentials file
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(json)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig(
                "Credentials file has neither an 'installed' nor a 'web' section".to_string(),
            )
        })?;

        if secrets.client_id.is_empty() {
            return Err(Error::InvalidConfig("Credentials file has an empty client_id".to_string()));
        }
        Ok(secrets)
    }

    /// Read and parse a credentials file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Cannot find the credentials file at {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
