//! MIME type helpers for Google Drive
//!
//! Google Workspace files (Docs, Sheets, Slides, Drawings) only exist inside
//! Drive and have to be exported to a regular format before they can be
//! downloaded. See <https://developers.google.com/drive/api/guides/ref-export-formats>.

/// MIME type of a Drive folder
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by every Drive-native MIME type
const NATIVE_PREFIX: &str = "application/vnd.google-apps";

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Extensions picked ahead of the `mime_guess` reverse lookup, whose
/// first hit is not always the common one (e.g. `jpe` for JPEG).
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    (DOCX, "docx"),
    (XLSX, "xlsx"),
    (PPTX, "pptx"),
    ("application/pdf", "pdf"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("text/plain", "txt"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("application/json", "json"),
    ("application/zip", "zip"),
    ("application/octet-stream", "bin"),
];

/// Whether `mime_type` is a Drive-native type (including folders)
pub fn is_native(mime_type: &str) -> bool {
    mime_type.starts_with(NATIVE_PREFIX)
}

/// Whether `mime_type` is the folder type
pub fn is_folder(mime_type: &str) -> bool {
    mime_type == FOLDER_MIME_TYPE
}

/// Map a Drive-native type to the format it is exported as.
///
/// Returns `None` for every type outside the fixed table; callers treat
/// that as an unsupported type.
pub fn resolve_export(native_type: &str) -> Option<&'static str> {
    match native_type {
        "application/vnd.google-apps.document" => Some(DOCX),
        "application/vnd.google-apps.spreadsheet" => Some(XLSX),
        "application/vnd.google-apps.presentation" => Some(PPTX),
        "application/vnd.google-apps.drawing" => Some("image/png"),
        _ => None,
    }
}

/// File extension (without the dot) for a MIME type
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();

    PREFERRED_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&essence)
                .and_then(|extensions| extensions.first().copied())
        })
}

/// MIME type for a local file, falling back to `application/octet-stream`
pub fn guess_from_path(path: &std::path::Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
