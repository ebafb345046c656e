//! Google Drive API v3 resources
//!
//! Only the fields requested through `fields=` are present in a response,
//! so everything except the id is optional or defaulted.

use serde::{Deserialize, Serialize};

/// Google Drive file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Parent folder IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// Size in bytes, encoded as a string (omitted for folders and native files)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
}

impl DriveFile {
    /// Metadata for a new folder
    pub fn folder(name: &str, parent_id: &str) -> Self {
        Self {
            name: name.to_string(),
            mime_type: Some(crate::mime::FOLDER_MIME_TYPE.to_string()),
            parents: vec![parent_id.to_string()],
            ..Default::default()
        }
    }

    /// Metadata for an upload (lands in the root folder)
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref().is_some_and(crate::mime::is_folder)
    }
}

/// Google Drive files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    pub next_page_token: Option<String>,
}

/// A file or folder record with its parent references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub parent_ids: Vec<String>,
}

impl From<DriveFile> for Entry {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            parent_ids: file.parents,
        }
    }
}

/// Parameters of one files.list call
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// Search filter (`q` parameter)
    pub query: String,
    /// Partial response selector (`fields` parameter)
    pub fields: String,
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl ListRequest {
    pub fn new(query: impl Into<String>, fields: impl Into<String>, page_size: u32) -> Self {
        Self {
            query: query.into(),
            fields: fields.into(),
            page_size,
            page_token: None,
        }
    }

    pub fn with_page_token(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }
}
