//! gdpilot-core - Core library for the gdpilot CLI
//!
//! This library provides a convenience layer over the Google Drive v3 API:
//! OAuth session management, folder lookup/creation/deletion, paginated
//! listings, the folder hierarchy, and file upload/download with export of
//! Google Workspace documents.

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod drive;
pub mod error;
pub mod hierarchy;
pub mod links;
pub mod mime;
pub mod pagination;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use auth::{Authenticator, FileTokenStore, InstalledFlow, MemoryTokenStore, OAuthTokens, TokenStore};
pub use client::{AuthState, DriveClient};
pub use config::{config_exists, get_config_path, load_config, save_config, validate_config};
pub use config::{ClientConfig, Config, ConfigFile, DriveConfig, LoggingConfig};
pub use drive::{DriveApi, DriveFile, Entry, HttpDriveApi};
pub use error::{AuthorizationError, Error, Result};
pub use hierarchy::{format_tree, TreeLine};
pub use links::{extract_folder_id, folder_url};
