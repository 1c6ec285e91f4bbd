//! HTTP side of the sync layer
//!
//! Saves go out as `POST /save/<id>` with a form-encoded `content` field.
//! Any 2xx is success, anything else carries a plain-text reason.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request, StatusCode};
use tracing::debug;

use super::error::SaveError;
use crate::document_id::Endpoints;

/// Timeout for a single save request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends the full note to the server
pub trait SaveTransport: Send + Sync + 'static {
    fn save(&self, content: &str) -> impl Future<Output = Result<(), SaveError>> + Send;
}

/// reqwest-backed transport bound to one document
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    save_url: String,
    raw_url: String,
}

impl HttpTransport {
    /// Create a transport for the document behind `endpoints`
    pub fn new(endpoints: &Endpoints) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, endpoints)
    }

    /// Use an existing client (shared connection pool, custom TLS, ...)
    pub fn with_client(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            save_url: endpoints.save_url(),
            raw_url: endpoints.raw_url(),
        }
    }

    /// Build the save request without sending it
    pub fn build_save_request(&self, content: &str) -> reqwest::Result<Request> {
        self.client
            .post(&self.save_url)
            .form(&[("content", content)])
            .build()
    }

    /// Load the current server copy of the note
    ///
    /// The server answers `?raw` with `text/plain` for existing notes. A
    /// note that was never saved comes back as the HTML editor page (or 404),
    /// which means the document is empty.
    pub async fn fetch_initial(&self) -> Result<String> {
        debug!("Fetching initial content from {}", self.raw_url);
        let response = self
            .client
            .get(&self.raw_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch note from {}", self.raw_url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(String::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Server returned HTTP {} for {}: {}", status, self.raw_url, body.trim());
        }

        let is_plain_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/plain"));
        if !is_plain_text {
            return Ok(String::new());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read note body from {}", self.raw_url))
    }
}

impl SaveTransport for HttpTransport {
    async fn save(&self, content: &str) -> Result<(), SaveError> {
        let request = self
            .build_save_request(content)
            .map_err(|e| SaveError::Transport(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| SaveError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SaveError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn transport() -> HttpTransport {
        let endpoints = Endpoints::from_page_url("http://localhost:8080/abc12").unwrap();
        HttpTransport::new(&endpoints)
    }

    #[test]
    fn test_save_request_is_form_encoded() {
        let request = transport().build_save_request("hello world").unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:8080/save/abc12");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"content=hello+world");
    }

    #[test]
    fn test_save_request_escapes_reserved_characters() {
        let request = transport().build_save_request("a&b=c\n").unwrap();
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"content=a%26b%3Dc%0A");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening
        let endpoints = Endpoints::from_page_url("http://127.0.0.1:9/abc12").unwrap();
        let transport = HttpTransport::new(&endpoints);

        let err = transport.save("hello").await.unwrap_err();
        assert!(err.is_transport());
    }

    /// Serve one canned response on a local port, returning the page URL
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Read up to the end of the form body
            while !request.ends_with(b"content=big") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/abc12", addr)
    }

    #[tokio::test]
    async fn test_rejection_body_is_kept_verbatim() {
        let page_url = serve_once(
            "HTTP/1.1 413 Payload Too Large\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 21\r\n\
             Connection: close\r\n\
             \r\n\
             \x20Note is too large.\n\n",
        )
        .await;
        let transport = HttpTransport::new(&Endpoints::from_page_url(&page_url).unwrap());

        let err = transport.save("big").await.unwrap_err();
        assert_eq!(
            err,
            SaveError::Rejected {
                status: 413,
                body: " Note is too large.\n\n".to_string(),
            }
        );
        assert_eq!(err.user_message(), " Note is too large.\n\n");
    }
}
