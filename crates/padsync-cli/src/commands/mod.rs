//! Command handlers

pub mod config;
pub mod edit;
pub mod watch;

use anyhow::{Context, Result};

use padsync_core::{Config, DocumentId, Endpoints};

/// Resolve a command-line target to endpoints
///
/// Accepts a full page URL (`https://host/abc12`) or a bare note path
/// (`abc12`, `/abc12`) on the configured server.
pub fn resolve_endpoints(target: &str, config: &Config) -> Result<Endpoints> {
    if target.contains("://") {
        return Endpoints::from_page_url(target)
            .with_context(|| format!("Invalid note URL: {}", target));
    }

    let doc_id = DocumentId::from_path(target)?;
    Endpoints::new(&config.server_url, doc_id)
        .with_context(|| format!("Invalid server_url: {}", config.server_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bare_id_uses_configured_server() {
        let config = Config {
            server_url: "https://notes.example.com".to_string(),
            ..Config::default()
        };

        let endpoints = resolve_endpoints("/abc12", &config).unwrap();
        assert_eq!(endpoints.channel_url(), "wss://notes.example.com/ws/abc12");
    }

    #[test]
    fn test_resolve_page_url_ignores_configured_server() {
        let config = Config::default();

        let endpoints = resolve_endpoints("http://10.0.0.5:8080/xyz", &config).unwrap();
        assert_eq!(endpoints.save_url(), "http://10.0.0.5:8080/save/xyz");
    }

    #[test]
    fn test_resolve_rejects_nested_path() {
        let config = Config::default();
        assert!(resolve_endpoints("a/b", &config).is_err());
    }
}
