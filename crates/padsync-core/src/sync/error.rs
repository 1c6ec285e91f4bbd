//! Sync error handling
//!
//! Typed errors for the push channel and the save endpoint, with the
//! user-facing wording for save failures.

use thiserror::Error;

/// Shown when a save never got a response from the server
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Failed to save. The note might be too large or there was a network issue.";

/// Shown when the server rejected a save without explaining why
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to save note.";

/// Errors that can occur while saving the note
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The request never produced a response (DNS, refused, reset, ...)
    #[error("Save request did not reach the server: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server rejected save (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl SaveError {
    /// Whether the request failed below HTTP
    pub fn is_transport(&self) -> bool {
        matches!(self, SaveError::Transport(_))
    }

    /// Message to surface to the user
    ///
    /// Rejections carry the server's own text verbatim.
    pub fn user_message(&self) -> String {
        match self {
            SaveError::Transport(_) => TRANSPORT_FAILURE_MESSAGE.to_string(),
            SaveError::Rejected { body, .. } if body.trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            SaveError::Rejected { body, .. } => body.clone(),
        }
    }
}

/// Errors that end one push-channel connection
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Handshake failed
    #[error("Failed to connect to {url}: {details}")]
    Connect { url: String, details: String },

    /// The socket failed after it was open
    #[error("Push channel error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_message() {
        let err = SaveError::Transport("connection refused".to_string());
        assert!(err.is_transport());
        assert_eq!(err.user_message(), TRANSPORT_FAILURE_MESSAGE);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_rejection_surfaces_server_text() {
        let err = SaveError::Rejected {
            status: 503,
            body: "Storage is overloaded.".to_string(),
        };
        assert!(!err.is_transport());
        assert_eq!(err.user_message(), "Storage is overloaded.");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_empty_rejection_falls_back() {
        let err = SaveError::Rejected {
            status: 500,
            body: "  ".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
