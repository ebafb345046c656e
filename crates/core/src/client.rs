//! Google Drive client facade
//!
//! [`DriveClient`] owns the OAuth session and turns the raw Drive API into
//! folder/file operations. A session goes Unauthorized → Authorizing →
//! Authorized; every Drive operation requires Authorized and refreshes a
//! stale access token before it goes out.

use crate::auth::{Authenticator, FileTokenStore, InstalledFlow, OAuthTokens, TokenStore};
use crate::config::{validate_page_size, ClientConfig, ROOT_FOLDER_ID};
use crate::drive::{query, DriveApi, DriveFile, Entry, HttpDriveApi, ListRequest};
use crate::error::{AuthorizationError, Error, Result};
use crate::hierarchy::{self, TreeLine};
use crate::mime;
use crate::pagination::{collect_pages, Page};
use bytes::Bytes;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Session state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthorized,
    Authorizing,
    Authorized,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::Unauthorized => "unauthorized",
            AuthState::Authorizing => "authorizing",
            AuthState::Authorized => "authorized",
        };
        f.write_str(label)
    }
}

enum Session {
    Unauthorized,
    Authorizing,
    Authorized(OAuthTokens),
}

/// Google Drive client
pub struct DriveClient {
    config: ClientConfig,
    api: Arc<dyn DriveApi>,
    authenticator: Arc<dyn Authenticator>,
    token_store: Arc<dyn TokenStore>,
    session: Arc<Mutex<Session>>,
}

/// Returns an abandoned authorization to Unauthorized.
///
/// Armed while `authorize` runs; a future dropped mid-flight (outer
/// timeout, `select!`) would otherwise leave the session Authorizing.
struct AuthorizingGuard {
    session: Arc<Mutex<Session>>,
    armed: bool,
}

impl AuthorizingGuard {
    fn new(session: Arc<Mutex<Session>>) -> Self {
        Self { session, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AuthorizingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Authorization abandoned before completion");

        if let Ok(mut session) = self.session.try_lock() {
            abandon_authorizing(&mut session);
            return;
        }

        // Someone holds the lock right now; reset once it is released
        let session = Arc::clone(&self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    abandon_authorizing(&mut *session.lock().await);
                });
            }
            Err(_) => warn!("No runtime to reset the abandoned session on"),
        }
    }
}

/// Only the authorization that set Authorizing can be the one abandoning it
fn abandon_authorizing(session: &mut Session) {
    if matches!(session, Session::Authorizing) {
        *session = Session::Unauthorized;
    }
}

impl DriveClient {
    /// Client talking to Google, with tokens kept under `token_dir`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = HttpDriveApi::new(&config.application_name)?;
        let authenticator = InstalledFlow::new(config.credentials_path.clone(), config.redirect_port);
        let token_store = FileTokenStore::new(&config.token_dir);

        Self::with_parts(
            config,
            Arc::new(api),
            Arc::new(authenticator),
            Arc::new(token_store),
        )
    }

    /// Client over explicit collaborators
    pub fn with_parts(
        config: ClientConfig,
        api: Arc<dyn DriveApi>,
        authenticator: Arc<dyn Authenticator>,
        token_store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            api,
            authenticator,
            token_store,
            session: Arc::new(Mutex::new(Session::Unauthorized)),
        })
    }

    /// Build a client and authorize it right away
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.authorize().await?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn state(&self) -> AuthState {
        match *self.session.lock().await {
            Session::Unauthorized => AuthState::Unauthorized,
            Session::Authorizing => AuthState::Authorizing,
            Session::Authorized(_) => AuthState::Authorized,
        }
    }

    pub async fn is_authorized(&self) -> bool {
        self.state().await == AuthState::Authorized
    }

    /// Obtain a session: stored token first, then the consent flow.
    ///
    /// Fails with `AlreadyAuthorized` or `InProgress` unless the client is
    /// Unauthorized. Gives up after the configured timeout. Any failure
    /// leaves the client Unauthorized.
    #[instrument(skip(self))]
    pub async fn authorize(&self) -> Result<()> {
        {
            let mut session = self.session.lock().await;
            match *session {
                Session::Authorized(_) => return Err(AuthorizationError::AlreadyAuthorized.into()),
                Session::Authorizing => return Err(AuthorizationError::InProgress.into()),
                Session::Unauthorized => *session = Session::Authorizing,
            }
        }
        let guard = AuthorizingGuard::new(Arc::clone(&self.session));

        let timeout = self.config.auth_timeout;
        let outcome = match tokio::time::timeout(timeout, self.obtain_tokens()).await {
            Ok(result) => result,
            Err(_) => Err(AuthorizationError::Timeout(timeout.as_secs()).into()),
        };

        let mut session = self.session.lock().await;
        guard.disarm();
        match outcome {
            Ok(tokens) => {
                *session = Session::Authorized(tokens);
                info!("Drive client authorized");
                Ok(())
            }
            Err(e) => {
                *session = Session::Unauthorized;
                warn!("Authorization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn obtain_tokens(&self) -> Result<OAuthTokens> {
        if let Some(stored) = self.token_store.load().await? {
            if !stored.is_stale() {
                debug!("Reusing stored token");
                return Ok(stored);
            }
            if stored.refresh_token.is_some() {
                match self.refresh_tokens(&stored).await {
                    Ok(fresh) => return Ok(fresh),
                    Err(e) => warn!("Stored token could not be refreshed, asking for consent: {}", e),
                }
            }
        }

        let tokens = self.authenticator.authorize().await?;
        self.token_store.save(&tokens).await?;
        Ok(tokens)
    }

    /// Refresh through the authenticator and persist the result
    async fn refresh_tokens(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        let fresh = self
            .authenticator
            .refresh(tokens)
            .await
            .map_err(|e| match e {
                Error::Authorization(inner) => inner,
                other => AuthorizationError::RefreshFailed(other.to_string()),
            })?;

        if let Err(e) = self.token_store.save(&fresh).await {
            warn!("Refreshed token could not be saved: {}", e);
        }
        Ok(fresh)
    }

    /// Refresh the access token if it is stale.
    ///
    /// Returns `Ok(true)` when a refresh happened, `Ok(false)` when the
    /// client is not authorized or the token is still fresh.
    pub async fn try_refresh_token(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        let Session::Authorized(tokens) = &mut *session else {
            return Ok(false);
        };
        if !tokens.is_stale() {
            return Ok(false);
        }

        let fresh = self.refresh_tokens(tokens).await?;
        *tokens = fresh;
        Ok(true)
    }

    /// Drop the session and forget the stored token
    pub async fn sign_out(&self) -> Result<()> {
        {
            let mut session = self.session.lock().await;
            if matches!(*session, Session::Authorizing) {
                return Err(AuthorizationError::InProgress.into());
            }
            *session = Session::Unauthorized;
        }

        self.token_store.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Current access token, refreshed first if stale
    async fn access_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        let Session::Authorized(tokens) = &mut *session else {
            return Err(AuthorizationError::NotAuthorized.into());
        };

        if tokens.is_stale() {
            debug!("Access token is stale, refreshing");
            let fresh = self.refresh_tokens(tokens).await?;
            *tokens = fresh;
        }
        Ok(tokens.access_token.clone())
    }

    /// Every page of a files.list query, as entries
    async fn list_entries(&self, filter: &str, fields: &str, page_size: u32) -> Result<Vec<Entry>> {
        validate_page_size(page_size)?;

        collect_pages(self.config.max_pages, |page_token| {
            let request = ListRequest::new(filter, fields, page_size).with_page_token(page_token);
            async move {
                let token = self.access_token().await?;
                let list = self.api.list_files(&token, &request).await?;
                let entries = list.files.into_iter().map(Entry::from).collect();
                Ok(Page::new(entries, list.next_page_token))
            }
        })
        .await
    }

    /// ID of the folder called `name` directly under `parent_id`
    #[instrument(skip(self))]
    pub async fn find_folder_id(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        require("folder name", name)?;
        require("parent folder id", parent_id)?;

        let token = self.access_token().await?;
        let request = ListRequest::new(query::folder_named(name, parent_id), query::LOOKUP_FIELDS, 1);
        let list = self.api.list_files(&token, &request).await?;

        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    /// `(id, name)` of every folder directly under `parent_id`
    #[instrument(skip(self))]
    pub async fn list_folders(&self, parent_id: &str, page_size: u32) -> Result<Vec<(String, String)>> {
        require("parent folder id", parent_id)?;

        let entries = self
            .list_entries(&query::folders_in(parent_id), query::LIST_FIELDS, page_size)
            .await?;
        Ok(entries.into_iter().map(|e| (e.id, e.name)).collect())
    }

    /// Every item matching a raw Drive search filter
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &str, page_size: u32) -> Result<Vec<Entry>> {
        self.list_entries(filter, query::TREE_FIELDS, page_size).await
    }

    /// Every folder the user can see, with parents
    #[instrument(skip(self))]
    pub async fn list_all_folders(&self, page_size: u32) -> Result<Vec<Entry>> {
        self.list_entries(&query::all_folders(), query::TREE_FIELDS, page_size)
            .await
    }

    /// Folder hierarchy, rooted at My Drive plus any parentless folders
    /// shared with the user
    #[instrument(skip(self))]
    pub async fn folder_tree(&self, page_size: u32) -> Result<Vec<TreeLine>> {
        validate_page_size(page_size)?;

        let token = self.access_token().await?;
        let root = self
            .api
            .get_file(&token, ROOT_FOLDER_ID, query::METADATA_FIELDS)
            .await?;

        let mut entries = vec![Entry {
            id: root.id,
            name: root.name,
            parent_ids: Vec::new(),
        }];
        entries.extend(self.list_all_folders(page_size).await?);

        let index = hierarchy::build_index(&entries);
        Ok(hierarchy::render(&entries, &index))
    }

    /// Create a folder under `parent_id` and return its ID
    #[instrument(skip(self))]
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        require("folder name", name)?;
        require("parent folder id", parent_id)?;

        let token = self.access_token().await?;
        let created = self
            .api
            .create_file(&token, &DriveFile::folder(name, parent_id))
            .await?;

        if created.id.is_empty() {
            return Err(Error::Transfer(format!(
                "Folder creation failed, no id returned for '{}'.",
                name
            )));
        }
        info!("Created folder '{}' ({})", name, created.id);
        Ok(created.id)
    }

    /// Permanently delete a folder and its contents.
    ///
    /// Returns `Ok(false)` without deleting when the item is not a folder.
    #[instrument(skip(self))]
    pub async fn delete_folder(&self, folder_id: &str) -> Result<bool> {
        require("folder id", folder_id)?;

        let token = self.access_token().await?;
        let item = self
            .api
            .get_file(&token, folder_id, query::METADATA_FIELDS)
            .await?;

        if !item.is_folder() {
            warn!(
                "'{}' ({}) is not a folder, refusing to delete it",
                item.name, folder_id
            );
            return Ok(false);
        }

        self.api.delete_file(&token, folder_id).await?;
        info!("Deleted folder '{}' ({})", item.name, folder_id);
        Ok(true)
    }

    /// ID of the item called `name` directly under `parent_id`
    #[instrument(skip(self))]
    pub async fn find_file_id(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        require("file name", name)?;
        require("parent folder id", parent_id)?;

        let token = self.access_token().await?;
        let request = ListRequest::new(query::file_named(name, parent_id), query::LOOKUP_FIELDS, 1);
        let list = self.api.list_files(&token, &request).await?;

        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    /// Upload a local file, named after its file name, into the root folder
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn upload_path(&self, path: impl AsRef<Path>, mime_type: &str) -> Result<String> {
        let path = path.as_ref();
        require("mime type", mime_type)?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "Cannot find the file at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!("{} is not a file", path.display())));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", path.display())))?;
        let content = tokio::fs::read(path).await?;

        self.upload_bytes(content, &name, mime_type).await
    }

    /// Upload an in-memory buffer into the root folder
    #[instrument(skip(self, content))]
    pub async fn upload_bytes(
        &self,
        content: impl Into<Bytes>,
        name: &str,
        mime_type: &str,
    ) -> Result<String> {
        require("file name", name)?;
        require("mime type", mime_type)?;
        let content = content.into();
        let size = content.len();

        let token = self.access_token().await?;
        let uploaded = self
            .api
            .upload(&token, &DriveFile::named(name), content, mime_type)
            .await?;

        if uploaded.id.is_empty() {
            return Err(Error::Transfer(
                "File upload failed, no response body received.".to_string(),
            ));
        }
        info!("Uploaded '{}' ({} bytes) as {}", name, size, uploaded.id);
        Ok(uploaded.id)
    }

    /// Download a file into `dest_dir` and return the written path.
    ///
    /// Drive-native documents are exported (Docs to .docx, Sheets to .xlsx,
    /// Slides to .pptx, Drawings to .png). The file only appears once the
    /// whole transfer succeeded.
    #[instrument(skip(self, dest_dir), fields(dest = %dest_dir.as_ref().display()))]
    pub async fn download(&self, file_id: &str, dest_dir: impl AsRef<Path>) -> Result<PathBuf> {
        require("file id", file_id)?;
        let dest_dir = dest_dir.as_ref();
        if dest_dir.as_os_str().is_empty() {
            return Err(Error::empty_argument("destination directory"));
        }

        let token = self.access_token().await?;
        let file = self
            .api
            .get_file(&token, file_id, query::METADATA_FIELDS)
            .await?;
        let source_type = file
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let (content, extension) = if mime::is_native(&source_type) {
            let export_type = mime::resolve_export(&source_type)
                .ok_or_else(|| Error::UnsupportedType(source_type.clone()))?;
            let extension = mime::extension_for(export_type)
                .ok_or_else(|| Error::UnsupportedType(export_type.to_string()))?;

            debug!("Exporting {} as {}", source_type, export_type);
            let content = self.api.export(&token, file_id, export_type).await?;
            (content, Some(extension))
        } else {
            // Keep the remote name when it already carries an extension
            let extension = if Path::new(&file.name).extension().is_some() {
                None
            } else {
                Some(
                    mime::extension_for(&source_type)
                        .ok_or_else(|| Error::UnsupportedType(source_type.clone()))?,
                )
            };
            (self.api.download(&token, file_id).await?, extension)
        };

        let file_name = local_file_name(&file.name, file_id, extension);
        let path = write_atomically(dest_dir, &file_name, content).await?;
        info!("Downloaded {} to {}", file_id, path.display());
        Ok(path)
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::empty_argument(name));
    }
    Ok(())
}

/// Safe local file name for a remote item
fn local_file_name(remote_name: &str, file_id: &str, extension: Option<&str>) -> String {
    let mut base: String = remote_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if matches!(base.trim(), "" | "." | "..") {
        base = file_id.to_string();
    }

    match extension {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

/// Write into a temp file next to the target, then rename over it
async fn write_atomically(dest_dir: &Path, file_name: &str, content: Bytes) -> Result<PathBuf> {
    let dest_dir = dest_dir.to_path_buf();
    let target = dest_dir.join(file_name);

    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        std::fs::create_dir_all(&dest_dir)?;
        let mut temp = NamedTempFile::new_in(&dest_dir)?;
        temp.write_all(&content)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| Error::Io(e.error))?;
        Ok(target)
    })
    .await
    .map_err(|e| Error::Other(format!("Download writer task failed: {}", e)))?
}
