//! Configuration management for gdpilot

use crate::error::{Error, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration directory name
const CONFIG_DIR: &str = "gdpilot";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Token folder name (inside the config directory)
const TOKEN_DIR: &str = "tokens";

/// Id of the top of the "My Drive" tree
pub const ROOT_FOLDER_ID: &str = "root";

/// Largest page size the files.list endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub drive: DriveConfig,
    pub logging: Option<LoggingConfig>,
}

/// Google Drive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// OAuth client secrets downloaded from the Google Cloud console
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Folder where the OAuth token is persisted
    pub token_dir: String,
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
    #[serde(default = "default_parent")]
    pub default_parent: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Loopback port for the OAuth redirect (0 picks a free port)
    #[serde(default)]
    pub redirect_port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let token_dir = home_dir()
            .map(|home| home.join(".config").join(CONFIG_DIR).join(TOKEN_DIR))
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| TOKEN_DIR.to_string());

        Self {
            credentials_path: default_credentials_path(),
            token_dir,
            application_name: default_application_name(),
            page_size: default_page_size(),
            auth_timeout_secs: default_auth_timeout(),
            default_parent: default_parent(),
            max_pages: default_max_pages(),
            redirect_port: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default values
fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_application_name() -> String {
    "gdpilot".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_auth_timeout() -> u64 {
    30
}

fn default_parent() -> String {
    ROOT_FOLDER_ID.to_string()
}

fn default_max_pages() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Immutable settings a `DriveClient` is built from.
///
/// Every field is set up front and checked once by
/// [`ClientConfig::validate`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials_path: PathBuf,
    pub token_dir: PathBuf,
    pub application_name: String,
    pub page_size: u32,
    pub auth_timeout: Duration,
    pub default_parent: String,
    pub max_pages: u32,
    pub redirect_port: u16,
}

impl ClientConfig {
    /// Settings with defaults for everything but the two paths
    pub fn new(credentials_path: impl Into<PathBuf>, token_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_dir: token_dir.into(),
            application_name: default_application_name(),
            page_size: default_page_size(),
            auth_timeout: Duration::from_secs(default_auth_timeout()),
            default_parent: default_parent(),
            max_pages: default_max_pages(),
            redirect_port: 0,
        }
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_default_parent(mut self, parent: impl Into<String>) -> Self {
        self.default_parent = parent.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Build from the `[drive]` section of the config file
    pub fn from_file_config(drive: &DriveConfig) -> Result<Self> {
        let config = Self {
            credentials_path: expand_home(&drive.credentials_path),
            token_dir: expand_home(&drive.token_dir),
            application_name: drive.application_name.clone(),
            page_size: drive.page_size,
            auth_timeout: Duration::from_secs(drive.auth_timeout_secs),
            default_parent: drive.default_parent.clone(),
            max_pages: drive.max_pages,
            redirect_port: drive.redirect_port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every field; the client refuses to start on invalid settings
    pub fn validate(&self) -> Result<()> {
        if self.credentials_path.as_os_str().is_empty() {
            return Err(Error::InvalidInput("Credentials path cannot be empty".to_string()));
        }
        if self.token_dir.as_os_str().is_empty() {
            return Err(Error::InvalidInput("Token folder cannot be empty".to_string()));
        }
        if self.application_name.trim().is_empty() {
            return Err(Error::InvalidInput("Application name cannot be empty".to_string()));
        }
        validate_page_size(self.page_size)?;
        if self.auth_timeout.is_zero() {
            return Err(Error::InvalidInput(
                "Authorization timeout must be at least 1 second".to_string(),
            ));
        }
        if self.default_parent.is_empty() {
            return Err(Error::InvalidInput("Default parent id cannot be empty".to_string()));
        }
        if self.max_pages == 0 {
            return Err(Error::InvalidInput("Max pages must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Page size must be in `1..=1000`
pub fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 {
        return Err(Error::InvalidInput("Page size cannot be smaller than 1".to_string()));
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(Error::InvalidInput(format!(
            "Page size cannot exceed {} (got {})",
            MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    let config_dir = home.join(".config").join(CONFIG_DIR);

    // Create directory if it doesn't exist
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    Ok(config_dir)
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Default folder for the persisted OAuth token
pub fn get_default_token_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(TOKEN_DIR))
}

/// Load configuration from file
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from an explicit path
pub fn load_config_from(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Err(Error::ConfigNotFound(config_path.to_path_buf()));
    }

    let content = fs::read_to_string(config_path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(config, &get_config_path()?)
}

/// Save configuration to an explicit path
pub fn save_config_to(config: &ConfigFile, config_path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| {
        Error::InvalidConfig(format!("Failed to serialize config: {}", e))
    })?;

    fs::write(config_path, content).map_err(|e| {
        Error::Config(format!("Failed to write config file: {}", e))
    })?;

    // Set secure permissions on config file (read/write for owner only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(config_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(config_path, perms)?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    ClientConfig::from_file_config(&config.drive)?;

    if let Some(logging) = &config.logging {
        match logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(Error::InvalidInput(format!(
                    "Unknown log format '{}' (expected 'pretty' or 'compact')",
                    other
                )))
            }
        }
    }

    Ok(())
}

/// Check if configuration exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Public alias for ConfigFile (used by lib.rs)
pub use ConfigFile as Config;
