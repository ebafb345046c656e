//! Conversions between Drive folder ids and browser URLs

use crate::config::ROOT_FOLDER_ID;

const ROOT_FOLDER_URL: &str = "https://drive.google.com/drive/my-drive";
const FOLDER_BASE_URL: &str = "https://drive.google.com/drive/folders/";

/// Extract the folder id from a folder URL.
///
/// Accepts anything containing `https://drive.google.com/drive/folders/<id>`
/// (query strings and `/u/0/` style prefixes are ignored). Falls back to
/// the root id when no folder id is present.
pub fn extract_folder_id(url: &str) -> String {
    let tail = url
        .find("drive.google.com/")
        .map(|start| &url[start..])
        .and_then(|rest| rest.find("/folders/").map(|pos| &rest[pos + "/folders/".len()..]));

    let id: String = tail
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if id.is_empty() {
        ROOT_FOLDER_ID.to_string()
    } else {
        id
    }
}

/// Browser URL for a folder id
pub fn folder_url(folder_id: &str) -> String {
    if folder_id == ROOT_FOLDER_ID {
        ROOT_FOLDER_URL.to_string()
    } else {
        format!("{}{}", FOLDER_BASE_URL, folder_id)
    }
}
