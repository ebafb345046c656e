//! Loopback HTTP listener that catches the OAuth redirect

use crate::error::{AuthorizationError, Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use url::Url;

const SUCCESS_PAGE: &str = "<html><body><h3>gdpilot is authorized.</h3>\
<p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h3>Authorization failed.</h3>\
<p>Return to the terminal for details.</p></body></html>";

/// Query parameters Google appends to the redirect URI
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl Callback {
    /// Authorization code, provided the redirect carries the expected state
    pub fn into_code(self, expected_state: &str) -> Result<String> {
        if let Some(error) = self.error {
            return Err(AuthorizationError::Denied(error).into());
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthorizationError::StateMismatch.into());
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthorizationError::Denied("redirect carried no code".to_string()).into())
    }
}

/// Parse the request line of an HTTP request; `None` when it is not a redirect
pub fn parse_callback(request: &str) -> Option<Callback> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;

    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    let mut callback = Callback::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => callback.code = Some(value.into_owned()),
            "state" => callback.state = Some(value.into_owned()),
            "error" => callback.error = Some(value.into_owned()),
            _ => {}
        }
    }

    if callback == Callback::default() {
        None
    } else {
        Some(callback)
    }
}

/// Listener bound on 127.0.0.1, waiting for the browser to come back
pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackListener {
    /// Bind on `port`; 0 picks any free port
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        debug!("Listening for the OAuth redirect on {}", addr);

        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{}/", addr.port()),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serve requests until one carries the redirect, then return its code
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            let request = read_request(&mut stream).await?;

            let Some(callback) = parse_callback(&request) else {
                // favicon and friends
                debug!("Ignoring request from {} without OAuth parameters", peer);
                respond(&mut stream, "404 Not Found", "").await;
                continue;
            };

            let outcome = callback.into_code(expected_state);
            match &outcome {
                Ok(_) => respond(&mut stream, "200 OK", SUCCESS_PAGE).await,
                Err(e) => {
                    warn!("OAuth redirect rejected: {}", e);
                    respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
                }
            }
            return outcome;
        }
    }
}

/// Read up to the end of the request headers
async fn read_request(stream: &mut TcpStream) -> Result<String> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buffer.len() > 16 * 1024 {
            return Err(Error::InvalidInput("OAuth redirect request too large".to_string()));
        }
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Best effort: the browser may already have gone away
async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Could not answer the browser: {}", e);
    }
    let _ = stream.shutdown().await;
}
