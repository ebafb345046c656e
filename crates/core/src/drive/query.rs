//! Search filters for files.list
//!
//! See: https://developers.google.com/drive/api/guides/search-files

use crate::mime::FOLDER_MIME_TYPE;

/// Partial response for single-match lookups
pub const LOOKUP_FIELDS: &str = "files(id, name)";

/// Partial response for paginated id/name listings
pub const LIST_FIELDS: &str = "nextPageToken, files(id, name)";

/// Partial response for listings that feed the hierarchy
pub const TREE_FIELDS: &str = "nextPageToken, files(id, name, parents)";

/// Fields needed before a download or delete
pub const METADATA_FIELDS: &str = "id, name, mimeType";

/// Escape a value for use inside a single-quoted query string
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Non-trashed folder called `name` directly under `parent_id`
pub fn folder_named(name: &str, parent_id: &str) -> String {
    format!(
        "mimeType='{}' and name='{}' and '{}' in parents and trashed=false",
        FOLDER_MIME_TYPE,
        escape(name),
        escape(parent_id)
    )
}

/// Non-trashed folders directly under `parent_id`
pub fn folders_in(parent_id: &str) -> String {
    format!(
        "mimeType='{}' and '{}' in parents and trashed=false",
        FOLDER_MIME_TYPE,
        escape(parent_id)
    )
}

/// Every non-trashed folder the user can see
pub fn all_folders() -> String {
    format!("mimeType='{}' and trashed=false", FOLDER_MIME_TYPE)
}

/// Non-trashed item called `name` directly under `parent_id`
pub fn file_named(name: &str, parent_id: &str) -> String {
    format!(
        "name='{}' and '{}' in parents and trashed=false",
        escape(name),
        escape(parent_id)
    )
}
