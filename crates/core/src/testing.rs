//! In-memory Drive and authenticator for unit tests

use crate::auth::{Authenticator, OAuthTokens};
use crate::drive::{query, DriveApi, DriveFile, FileList, ListRequest};
use crate::error::{AuthorizationError, Error, Result};
use crate::mime;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const ROOT_ID: &str = "root-0";

#[derive(Default)]
struct DriveState {
    files: Vec<DriveFile>,
    contents: HashMap<String, Bytes>,
    next_id: usize,
    tokens_seen: Vec<String>,
    list_calls: usize,
    omit_ids: bool,
}

/// Drive kept in a Vec, answering the queries the client builds
#[derive(Default)]
pub struct FakeDrive {
    state: Mutex<DriveState>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file directly, bypassing the client
    pub fn insert(&self, name: &str, mime_type: &str, parents: &[&str], content: &[u8]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("id-{}", state.next_id);
        state.files.push(DriveFile {
            id: id.clone(),
            name: name.to_string(),
            mime_type: Some(mime_type.to_string()),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        });
        state.contents.insert(id.clone(), Bytes::copy_from_slice(content));
        id
    }

    pub fn file(&self, id: &str) -> Option<DriveFile> {
        self.state.lock().unwrap().files.iter().find(|f| f.id == id).cloned()
    }

    pub fn contents(&self, id: &str) -> Option<Bytes> {
        self.state.lock().unwrap().contents.get(id).cloned()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens_seen.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Created and uploaded files come back without an id
    pub fn omit_ids(&self) {
        self.state.lock().unwrap().omit_ids = true;
    }

    fn answer(&self, mut file: DriveFile) -> DriveFile {
        if self.state.lock().unwrap().omit_ids {
            file.id.clear();
        }
        file
    }

    fn record(&self, token: &str) {
        self.state.lock().unwrap().tokens_seen.push(token.to_string());
    }
}

fn normalize(parent: &str) -> &str {
    if parent == "root" {
        ROOT_ID
    } else {
        parent
    }
}

/// Regenerate each query shape for the file and compare
fn matches(file: &DriveFile, q: &str) -> bool {
    let folder = file.is_folder();
    if q == query::all_folders() {
        return folder;
    }
    file.parents.iter().any(|parent| {
        let mut aliases = vec![parent.as_str()];
        if parent == ROOT_ID {
            aliases.push("root");
        }
        aliases.into_iter().any(|p| {
            (folder && (q == query::folders_in(p) || q == query::folder_named(&file.name, p)))
                || q == query::file_named(&file.name, p)
        })
    })
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files(&self, access_token: &str, request: &ListRequest) -> Result<FileList> {
        self.record(access_token);
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;

        let matching: Vec<DriveFile> = state
            .files
            .iter()
            .filter(|f| matches(f, &request.query))
            .cloned()
            .collect();

        let offset: usize = request
            .page_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let end = (offset + request.page_size as usize).min(matching.len());
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(FileList {
            files: matching[offset..end].to_vec(),
            next_page_token,
        })
    }

    async fn get_file(&self, access_token: &str, file_id: &str, _fields: &str) -> Result<DriveFile> {
        self.record(access_token);
        if file_id == "root" || file_id == ROOT_ID {
            return Ok(DriveFile {
                id: ROOT_ID.to_string(),
                name: "My Drive".to_string(),
                mime_type: Some(mime::FOLDER_MIME_TYPE.to_string()),
                ..Default::default()
            });
        }
        self.file(file_id)
            .ok_or_else(|| Error::NotFound(format!("File not found: {}.", file_id)))
    }

    async fn create_file(&self, access_token: &str, metadata: &DriveFile) -> Result<DriveFile> {
        self.record(access_token);
        let parents: Vec<&str> = metadata.parents.iter().map(|p| normalize(p)).collect();
        let id = self.insert(
            &metadata.name,
            metadata.mime_type.as_deref().unwrap_or("application/octet-stream"),
            &parents,
            b"",
        );
        let created = self
            .file(&id)
            .ok_or_else(|| Error::Other("lost created file".into()))?;
        Ok(self.answer(created))
    }

    async fn delete_file(&self, access_token: &str, file_id: &str) -> Result<()> {
        self.record(access_token);
        let mut state = self.state.lock().unwrap();
        let before = state.files.len();

        // Descendants go with the folder
        let mut doomed = vec![file_id.to_string()];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i].clone();
            doomed.extend(
                state
                    .files
                    .iter()
                    .filter(|f| f.parents.contains(&current))
                    .map(|f| f.id.clone()),
            );
            i += 1;
        }
        state.files.retain(|f| !doomed.contains(&f.id));

        if state.files.len() == before {
            return Err(Error::NotFound(format!("File not found: {}.", file_id)));
        }
        Ok(())
    }

    async fn upload(
        &self,
        access_token: &str,
        metadata: &DriveFile,
        content: Bytes,
        mime_type: &str,
    ) -> Result<DriveFile> {
        self.record(access_token);
        let id = self.insert(&metadata.name, mime_type, &[ROOT_ID], &content);
        Ok(self.answer(DriveFile {
            id,
            ..Default::default()
        }))
    }

    async fn download(&self, access_token: &str, file_id: &str) -> Result<Bytes> {
        self.record(access_token);
        self.contents(file_id)
            .ok_or_else(|| Error::Transfer(format!("Download of {} failed", file_id)))
    }

    async fn export(&self, access_token: &str, file_id: &str, mime_type: &str) -> Result<Bytes> {
        self.record(access_token);
        let file = self
            .file(file_id)
            .ok_or_else(|| Error::Transfer(format!("Export of {} failed", file_id)))?;
        Ok(Bytes::from(format!("{} as {}", file.name, mime_type)))
    }
}

/// Authenticator with scripted outcomes
pub struct FakeAuthenticator {
    pub authorize_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub deny: bool,
    pub fail_refresh: bool,
    pub delay: Option<Duration>,
    /// Lifetime of issued access tokens, in seconds
    pub expires_in: i64,
}

impl Default for FakeAuthenticator {
    fn default() -> Self {
        Self {
            authorize_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            deny: false,
            fail_refresh: false,
            delay: None,
            expires_in: 3600,
        }
    }
}

impl FakeAuthenticator {
    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn authorize(&self) -> Result<OAuthTokens> {
        let call = self.authorize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.deny {
            return Err(AuthorizationError::Denied("access_denied".into()).into());
        }
        Ok(OAuthTokens::new(
            format!("interactive-{}", call),
            Some("1//refresh".into()),
            self.expires_in,
        ))
    }

    async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_refresh {
            return Err(Error::Network("token endpoint unreachable".into()));
        }
        Ok(OAuthTokens::new(
            format!("refreshed-{}", call),
            tokens.refresh_token.clone(),
            3600,
        ))
    }
}
