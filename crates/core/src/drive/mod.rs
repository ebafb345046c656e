//! Google Drive API v3 access
//!
//! [`DriveApi`] is the seam between the client facade and the provider:
//! [`HttpDriveApi`] talks to Google over HTTPS, tests plug in an
//! in-memory implementation.

mod http;
pub mod query;
mod types;

pub use http::HttpDriveApi;
pub use types::{DriveFile, Entry, FileList, ListRequest};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Raw Drive operations; every call carries the current access token
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// One page of files.list
    async fn list_files(&self, access_token: &str, request: &ListRequest) -> Result<FileList>;

    /// files.get (metadata only)
    async fn get_file(&self, access_token: &str, file_id: &str, fields: &str) -> Result<DriveFile>;

    /// files.create without content (folders)
    async fn create_file(&self, access_token: &str, metadata: &DriveFile) -> Result<DriveFile>;

    /// files.delete (permanent, skips the trash)
    async fn delete_file(&self, access_token: &str, file_id: &str) -> Result<()>;

    /// files.create with content
    async fn upload(
        &self,
        access_token: &str,
        metadata: &DriveFile,
        content: Bytes,
        mime_type: &str,
    ) -> Result<DriveFile>;

    /// files.get?alt=media
    async fn download(&self, access_token: &str, file_id: &str) -> Result<Bytes>;

    /// files.export
    async fn export(&self, access_token: &str, file_id: &str, mime_type: &str) -> Result<Bytes>;
}
