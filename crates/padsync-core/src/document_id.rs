//! Document identity
//!
//! A note is addressed by the path it is served under. The identity is that
//! path with the leading separator stripped, and it selects both the push
//! channel (`/ws/<id>`) and the save endpoint (`/save/<id>`).

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use thiserror::Error;

/// Errors that can occur when parsing a document ID
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentIdError {
    /// Path was empty after stripping the leading separator
    #[error("Document ID is empty")]
    Empty,

    /// Path would escape the note namespace on the server
    #[error("Invalid document ID '{0}': must not contain '/' or '..'")]
    InvalidPath(String),

    /// Character that would end or alter the URL path it is placed in
    #[error("Invalid document ID '{id}': character {ch:?} is not allowed")]
    ReservedCharacter { id: String, ch: char },
}

/// Stable key of the note a session is editing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derive an ID from a page path such as `/abc12`
    pub fn from_path(path: &str) -> Result<Self, DocumentIdError> {
        let id = path.strip_prefix('/').unwrap_or(path);

        if id.is_empty() {
            return Err(DocumentIdError::Empty);
        }
        if id.contains('/') || id.contains("..") {
            return Err(DocumentIdError::InvalidPath(id.to_string()));
        }
        // Anything that ends the path segment or reads as an escape
        if let Some(ch) = id.chars().find(|&c| {
            matches!(c, '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control()
        }) {
            return Err(DocumentIdError::ReservedCharacter {
                id: id.to_string(),
                ch,
            });
        }

        Ok(Self(id.to_string()))
    }

    /// The ID as it appears in URLs
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = DocumentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

/// Errors that can occur when deriving endpoints
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// Server URL could not be parsed
    #[error("Invalid server URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    /// Only http and https servers are supported
    #[error("Unsupported URL scheme '{0}': expected http or https")]
    UnsupportedScheme(String),

    /// URL has no host component
    #[error("Server URL '{0}' has no host")]
    MissingHost(String),

    /// The page path is not a valid document ID
    #[error(transparent)]
    DocumentId(#[from] DocumentIdError),
}

/// Server endpoints for one document
///
/// Every URL is built from the same identity, pushed as a single
/// percent-encoded path segment, so a session can never listen to one note
/// and save into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `http(s)://host[:port]/`
    base: Url,
    doc_id: DocumentId,
}

impl Endpoints {
    /// Build endpoints from a server base URL and a document ID
    pub fn new(server_url: &str, doc_id: DocumentId) -> Result<Self, EndpointError> {
        let url = parse_url(server_url)?;
        let base = origin(&url, server_url)?;

        Ok(Self { base, doc_id })
    }

    /// Build endpoints from the full URL of a note page, e.g.
    /// `https://notes.example.com/abc12`
    pub fn from_page_url(page_url: &str) -> Result<Self, EndpointError> {
        let url = parse_url(page_url)?;
        let base = origin(&url, page_url)?;
        let doc_id = DocumentId::from_path(url.path())?;

        Ok(Self { base, doc_id })
    }

    /// Document this session is bound to
    pub fn doc_id(&self) -> &DocumentId {
        &self.doc_id
    }

    /// Push channel URL (`ws://host/ws/<id>`, `wss` for https servers)
    pub fn channel_url(&self) -> String {
        let mut url = self.url_for(&["ws", self.doc_id.as_str()]);
        let scheme = if self.is_secure() { "wss" } else { "ws" };
        // http(s) and ws(s) share default ports
        let _ = url.set_scheme(scheme);
        url.to_string()
    }

    /// Save endpoint URL (`POST /save/<id>`)
    pub fn save_url(&self) -> String {
        self.url_for(&["save", self.doc_id.as_str()]).to_string()
    }

    /// Plain-text content URL (`GET /<id>?raw`)
    pub fn raw_url(&self) -> String {
        let mut url = self.url_for(&[self.doc_id.as_str()]);
        url.set_query(Some("raw"));
        url.to_string()
    }

    /// Page URL a browser would open for this note
    pub fn page_url(&self) -> String {
        self.url_for(&[self.doc_id.as_str()]).to_string()
    }

    fn is_secure(&self) -> bool {
        self.base.scheme() == "https"
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        url
    }
}

fn parse_url(raw: &str) -> Result<Url, EndpointError> {
    Url::parse(raw).map_err(|e| EndpointError::InvalidUrl {
        url: raw.to_string(),
        details: e.to_string(),
    })
}

/// Reduce `url` to its scheme, host and port
fn origin(url: &Url, raw: &str) -> Result<Url, EndpointError> {
    let scheme = match url.scheme() {
        scheme @ ("http" | "https") => scheme,
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };

    let host = url
        .host_str()
        .ok_or_else(|| EndpointError::MissingHost(raw.to_string()))?;
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    parse_url(&format!("{}://{}/", scheme, authority))
}
