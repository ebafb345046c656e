//! Google Drive API client over reqwest

use super::{DriveApi, DriveFile, FileList, ListRequest};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Media upload endpoint
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields returned for created folders
const CREATED_FIELDS: &str = "id, name, mimeType, parents";

/// Google Drive API client
pub struct HttpDriveApi {
    http_client: Client,
    base_url: String,
    upload_url: String,
}

impl HttpDriveApi {
    /// Create a new client; `application_name` becomes the User-Agent
    pub fn new(application_name: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(format!("{} (gdpilot/{})", application_name, env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: DRIVE_API_BASE.to_string(),
            upload_url: DRIVE_UPLOAD_BASE.to_string(),
        })
    }

    /// Point the client at another host (proxies, emulators)
    pub fn with_base_urls(mut self, base_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.upload_url = upload_url.into();
        self
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.base_url, file_id)
    }

    /// Read the whole body of a media response
    async fn read_media(&self, response: Response, what: &str, file_id: &str) -> Result<Bytes> {
        let response = check_status(response).await.map_err(|e| transfer_error(what, file_id, e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transfer(format!("{} of {} interrupted: {}", what, file_id, e)))?;

        debug!("{} of {} complete ({} bytes)", what, file_id, body.len());
        Ok(body)
    }
}

#[async_trait]
impl DriveApi for HttpDriveApi {
    #[instrument(skip(self, access_token), fields(q = %request.query))]
    async fn list_files(&self, access_token: &str, request: &ListRequest) -> Result<FileList> {
        let mut query = vec![
            ("q", request.query.clone()),
            ("fields", request.fields.clone()),
            ("pageSize", request.page_size.to_string()),
        ];
        if let Some(token) = &request.page_token {
            query.push(("pageToken", token.clone()));
        }

        let response = self
            .http_client
            .get(format!("{}/files", self.base_url))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        handle_response(response).await
    }

    #[instrument(skip(self, access_token))]
    async fn get_file(&self, access_token: &str, file_id: &str, fields: &str) -> Result<DriveFile> {
        let response = self
            .http_client
            .get(self.file_url(file_id))
            .bearer_auth(access_token)
            .query(&[("fields", fields)])
            .send()
            .await?;

        handle_response(response).await
    }

    #[instrument(skip(self, access_token, metadata), fields(name = %metadata.name))]
    async fn create_file(&self, access_token: &str, metadata: &DriveFile) -> Result<DriveFile> {
        let response = self
            .http_client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(access_token)
            .query(&[("fields", CREATED_FIELDS)])
            .json(metadata)
            .send()
            .await?;

        handle_response(response).await
    }

    #[instrument(skip(self, access_token))]
    async fn delete_file(&self, access_token: &str, file_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.file_url(file_id))
            .bearer_auth(access_token)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self, access_token, metadata, content), fields(name = %metadata.name, size = content.len()))]
    async fn upload(
        &self,
        access_token: &str,
        metadata: &DriveFile,
        content: Bytes,
        mime_type: &str,
    ) -> Result<DriveFile> {
        let boundary = new_boundary();
        let body = multipart_related_body(&boundary, metadata, &content, mime_type)?;

        let response = self
            .http_client
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("File upload failed: {}", e)))?;

        let response = check_status(response)
            .await
            .map_err(|e| transfer_error("Upload", &metadata.name, e))?;

        response
            .json::<DriveFile>()
            .await
            .map_err(|e| Error::Transfer(format!("File upload failed, unreadable response body: {}", e)))
    }

    #[instrument(skip(self, access_token))]
    async fn download(&self, access_token: &str, file_id: &str) -> Result<Bytes> {
        let response = self
            .http_client
            .get(self.file_url(file_id))
            .bearer_auth(access_token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("Download of {} failed: {}", file_id, e)))?;

        self.read_media(response, "Download", file_id).await
    }

    #[instrument(skip(self, access_token))]
    async fn export(&self, access_token: &str, file_id: &str, mime_type: &str) -> Result<Bytes> {
        let response = self
            .http_client
            .get(format!("{}/export", self.file_url(file_id)))
            .bearer_auth(access_token)
            .query(&[("mimeType", mime_type)])
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("Export of {} failed: {}", file_id, e)))?;

        self.read_media(response, "Export", file_id).await
    }
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Handle API response
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

/// Map non-2xx statuses to errors, passing successful responses through
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &error_text))
}

fn status_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 => Error::Authentication(message),
        403 => Error::PermissionDenied(message),
        404 => Error::NotFound(message),
        _ => Error::Api { status, message },
    }
}

/// Rejected credentials stay authentication errors; the rest become transfer errors
fn transfer_error(what: &str, subject: &str, err: Error) -> Error {
    match err {
        Error::Authentication(_) => err,
        other => Error::Transfer(format!("{} of {} failed: {}", what, subject, other)),
    }
}

fn new_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("gdpilot-{}", suffix)
}

/// Body for `uploadType=multipart`: JSON metadata part, then the media part
fn multipart_related_body(
    boundary: &str,
    metadata: &DriveFile,
    content: &[u8],
    mime_type: &str,
) -> Result<Vec<u8>> {
    let metadata_json = serde_json::to_vec(metadata)?;
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(&metadata_json);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// One canned reply: status, content type, body
    type Reply = (u16, &'static str, Vec<u8>);

    fn json_reply(status: u16, body: &str) -> Reply {
        (status, "application/json", body.as_bytes().to_vec())
    }

    /// Raw request text: head plus a Content-Length body
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
        let length: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < head_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request body");
            buf.extend_from_slice(&chunk[..n]);
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answer one connection per reply, in order; yields the requests seen
    async fn serve(replies: Vec<Reply>) -> (HttpDriveApi, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, content_type, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);

                let head = format!(
                    "HTTP/1.1 {} Reply\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    content_type,
                    body.len()
                );
                stream.write_all(head.as_bytes()).await.unwrap();
                stream.write_all(&body).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });

        let api = HttpDriveApi::new("gdpilot-tests")
            .unwrap()
            .with_base_urls(base.clone(), format!("{}/upload", base));
        (api, server)
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[test]
    fn test_client_creation() {
        let api = HttpDriveApi::new("QuickFilesLoad").unwrap();
        assert_eq!(api.base_url, "https://www.googleapis.com/drive/v3");
        assert_eq!(api.file_url("abc"), "https://www.googleapis.com/drive/v3/files/abc");

        let api = api.with_base_urls("http://localhost:9000", "http://localhost:9000/upload");
        assert_eq!(api.file_url("abc"), "http://localhost:9000/files/abc");
        assert_eq!(api.upload_url, "http://localhost:9000/upload");
    }

    #[test]
    fn test_status_error_parses_google_envelope() {
        let body = r#"{"error": {"code": 404, "message": "File not found: xyz.", "errors": []}}"#;

        match status_error(404, body) {
            Error::NotFound(message) => assert_eq!(message, "File not found: xyz."),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(status_error(401, "nope"), Error::Authentication(_)));
        assert!(matches!(status_error(403, ""), Error::PermissionDenied(_)));
        match status_error(500, "backend error") {
            Error::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_transfer_error_keeps_authentication() {
        let auth = transfer_error("Download", "f1", Error::Authentication("expired".into()));
        assert!(matches!(auth, Error::Authentication(_)));

        let other = transfer_error("Download", "f1", Error::NotFound("gone".into()));
        assert!(matches!(other, Error::Transfer(ref m) if m.starts_with("Download of f1 failed")));
    }

    #[test]
    fn test_multipart_related_body() {
        let metadata = DriveFile::named("notes.txt");
        let body = multipart_related_body("XYZ", &metadata, b"hello", "text/plain").unwrap();
        let text = String::from_utf8(body).unwrap();

        assert_eq!(
            text,
            "--XYZ\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {\"name\":\"notes.txt\"}\r\n\
             --XYZ\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = new_boundary();
        let b = new_boundary();
        assert!(a.starts_with("gdpilot-"));
        assert_eq!(a.len(), "gdpilot-".len() + 32);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_list_files_sends_paging_and_decodes_page() {
        let (api, server) = serve(vec![json_reply(
            200,
            r#"{"nextPageToken": "tok-2", "files": [{"id": "a", "name": "Alpha", "parents": ["root"]}]}"#,
        )])
        .await;

        let request = ListRequest::new("'root' in parents", "nextPageToken, files(id, name)", 2)
            .with_page_token(Some("tok-1".into()));
        let list = api.list_files("access-1", &request).await.unwrap();

        assert_eq!(list.next_page_token.as_deref(), Some("tok-2"));
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].id, "a");
        assert_eq!(list.files[0].parents, vec!["root".to_string()]);

        let requests = server.await.unwrap();
        let line = request_line(&requests[0]);
        assert!(line.starts_with("GET /files?"), "{}", line);
        assert!(line.contains("pageSize=2"));
        assert!(line.contains("pageToken=tok-1"));
        assert!(line.contains("q=%27root%27+in+parents"));
        assert!(requests[0].to_lowercase().contains("authorization: bearer access-1"));
    }

    #[tokio::test]
    async fn test_list_files_first_page_has_no_token() {
        let (api, server) = serve(vec![json_reply(200, r#"{"files": []}"#)]).await;

        let list = api
            .list_files("access-1", &ListRequest::new("trashed = false", "files(id)", 10))
            .await
            .unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());

        let requests = server.await.unwrap();
        assert!(!request_line(&requests[0]).contains("pageToken"));
    }

    #[tokio::test]
    async fn test_get_file_not_found() {
        let (api, server) = serve(vec![json_reply(
            404,
            r#"{"error": {"code": 404, "message": "File not found: gone."}}"#,
        )])
        .await;

        match api.get_file("access-1", "gone", "id, name, mimeType").await {
            Err(Error::NotFound(message)) => assert_eq!(message, "File not found: gone."),
            other => panic!("unexpected result: {:?}", other),
        }

        let requests = server.await.unwrap();
        assert!(request_line(&requests[0]).starts_with("GET /files/gone?fields="));
    }

    #[tokio::test]
    async fn test_create_folder_posts_metadata() {
        let (api, server) = serve(vec![json_reply(
            200,
            r#"{"id": "f-9", "name": "Reports", "mimeType": "application/vnd.google-apps.folder", "parents": ["root"]}"#,
        )])
        .await;

        let created = api
            .create_file("access-1", &DriveFile::folder("Reports", "root"))
            .await
            .unwrap();
        assert_eq!(created.id, "f-9");
        assert!(created.is_folder());

        let requests = server.await.unwrap();
        assert!(request_line(&requests[0]).starts_with("POST /files?fields="));
        assert!(requests[0].contains(r#""mimeType":"application/vnd.google-apps.folder""#));
        assert!(requests[0].contains(r#""parents":["root"]"#));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (api, server) = serve(vec![(204, "text/plain", Vec::new())]).await;

        api.delete_file("access-1", "f-9").await.unwrap();

        let requests = server.await.unwrap();
        assert!(request_line(&requests[0]).starts_with("DELETE /files/f-9 "));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_related() {
        let (api, server) = serve(vec![json_reply(200, r#"{"id": "up-1"}"#)]).await;

        let uploaded = api
            .upload(
                "access-1",
                &DriveFile::named("notes.txt"),
                Bytes::from_static(b"hello drive"),
                "text/plain",
            )
            .await
            .unwrap();
        assert_eq!(uploaded.id, "up-1");

        let requests = server.await.unwrap();
        let request = &requests[0];
        let line = request_line(request);
        assert!(line.starts_with("POST /upload/files?"), "{}", line);
        assert!(line.contains("uploadType=multipart"));

        let lower = request.to_lowercase();
        let boundary = lower
            .lines()
            .find_map(|l| l.strip_prefix("content-type: multipart/related; boundary="))
            .expect("multipart content type");
        assert!(boundary.starts_with("gdpilot-"));
        assert!(request.contains(r#"{"name":"notes.txt"}"#));
        assert!(request.contains("Content-Type: text/plain\r\n\r\nhello drive"));
    }

    #[tokio::test]
    async fn test_download_and_export_use_media_endpoints() {
        let (api, server) = serve(vec![
            (200, "application/octet-stream", b"raw bytes".to_vec()),
            (200, "application/pdf", b"%PDF".to_vec()),
        ])
        .await;

        let raw = api.download("access-1", "bin-1").await.unwrap();
        assert_eq!(raw, Bytes::from_static(b"raw bytes"));

        let exported = api.export("access-1", "doc-1", "application/pdf").await.unwrap();
        assert_eq!(exported, Bytes::from_static(b"%PDF"));

        let requests = server.await.unwrap();
        assert!(request_line(&requests[0]).starts_with("GET /files/bin-1?alt=media "));
        let export_line = request_line(&requests[1]);
        assert!(export_line.starts_with("GET /files/doc-1/export?"), "{}", export_line);
        assert!(export_line.contains("mimeType=application%2Fpdf"));
    }

    #[tokio::test]
    async fn test_failed_media_responses() {
        let (api, server) = serve(vec![
            json_reply(404, r#"{"error": {"code": 404, "message": "File not found: bin-2."}}"#),
            json_reply(401, r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#),
        ])
        .await;

        match api.download("access-1", "bin-2").await {
            Err(Error::Transfer(message)) => {
                assert!(message.starts_with("Download of bin-2 failed"));
                assert!(message.contains("File not found: bin-2."));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            api.export("expired", "doc-2", "application/pdf").await,
            Err(Error::Authentication(_))
        ));

        server.await.unwrap();
    }
}
