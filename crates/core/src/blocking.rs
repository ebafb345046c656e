//! Synchronous wrapper around [`crate::DriveClient`]
//!
//! Each call blocks the current thread on a private current-thread
//! runtime. Do not use it from inside an async context.

use crate::client::{self, AuthState};
use crate::config::ClientConfig;
use crate::drive::Entry;
use crate::error::Result;
use crate::hierarchy::TreeLine;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::runtime::{Builder, Runtime};

/// Blocking Google Drive client
pub struct DriveClient {
    inner: client::DriveClient,
    runtime: Runtime,
}

impl DriveClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_async(client::DriveClient::new(config)?)
    }

    /// Wrap an existing async client
    pub fn from_async(inner: client::DriveClient) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    /// Build a client and authorize it right away
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.authorize()?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    pub fn state(&self) -> AuthState {
        self.runtime.block_on(self.inner.state())
    }

    pub fn is_authorized(&self) -> bool {
        self.runtime.block_on(self.inner.is_authorized())
    }

    pub fn authorize(&self) -> Result<()> {
        self.runtime.block_on(self.inner.authorize())
    }

    pub fn try_refresh_token(&self) -> Result<bool> {
        self.runtime.block_on(self.inner.try_refresh_token())
    }

    pub fn sign_out(&self) -> Result<()> {
        self.runtime.block_on(self.inner.sign_out())
    }

    pub fn find_folder_id(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        self.runtime.block_on(self.inner.find_folder_id(name, parent_id))
    }

    pub fn list_folders(&self, parent_id: &str, page_size: u32) -> Result<Vec<(String, String)>> {
        self.runtime.block_on(self.inner.list_folders(parent_id, page_size))
    }

    pub fn list(&self, filter: &str, page_size: u32) -> Result<Vec<Entry>> {
        self.runtime.block_on(self.inner.list(filter, page_size))
    }

    pub fn list_all_folders(&self, page_size: u32) -> Result<Vec<Entry>> {
        self.runtime.block_on(self.inner.list_all_folders(page_size))
    }

    pub fn folder_tree(&self, page_size: u32) -> Result<Vec<TreeLine>> {
        self.runtime.block_on(self.inner.folder_tree(page_size))
    }

    pub fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        self.runtime.block_on(self.inner.create_folder(name, parent_id))
    }

    pub fn delete_folder(&self, folder_id: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.delete_folder(folder_id))
    }

    pub fn find_file_id(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        self.runtime.block_on(self.inner.find_file_id(name, parent_id))
    }

    pub fn upload_path(&self, path: impl AsRef<Path>, mime_type: &str) -> Result<String> {
        self.runtime.block_on(self.inner.upload_path(path, mime_type))
    }

    pub fn upload_bytes(&self, content: impl Into<Bytes>, name: &str, mime_type: &str) -> Result<String> {
        self.runtime
            .block_on(self.inner.upload_bytes(content, name, mime_type))
    }

    pub fn download(&self, file_id: &str, dest_dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.runtime.block_on(self.inner.download(file_id, dest_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::error::{AuthorizationError, Error};
    use crate::testing::{FakeAuthenticator, FakeDrive};
    use std::sync::Arc;

    fn blocking_client() -> DriveClient {
        let inner = client::DriveClient::with_parts(
            ClientConfig::new("credentials.json", "_metadata"),
            Arc::new(FakeDrive::new()),
            Arc::new(FakeAuthenticator::default()),
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();
        DriveClient::from_async(inner).unwrap()
    }

    #[test]
    fn test_blocking_folder_roundtrip() {
        let client = blocking_client();
        assert_eq!(client.state(), AuthState::Unauthorized);
        assert!(matches!(
            client.create_folder("A", "root"),
            Err(Error::Authorization(AuthorizationError::NotAuthorized))
        ));

        client.authorize().unwrap();
        let a = client.create_folder("A", "root").unwrap();
        let b = client.create_folder("B", &a).unwrap();

        assert_eq!(client.find_folder_id("A", "root").unwrap(), Some(a.clone()));
        assert_eq!(client.list_folders(&a, 50).unwrap(), vec![(b, "B".to_string())]);
        assert!(client.delete_folder(&a).unwrap());
        assert!(client.list_folders("root", 50).unwrap().is_empty());
    }

    #[test]
    fn test_blocking_upload_and_download() {
        let client = blocking_client();
        client.authorize().unwrap();

        let id = client
            .upload_bytes(&b"col\n1\n"[..], "data.csv", "text/csv")
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = client.download(&id, dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "data.csv");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "col\n1\n");
    }
}
