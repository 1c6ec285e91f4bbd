//! Terminal presentation
//!
//! The read-only view is either stdout (watch mode), a file kept in step with
//! the last synced content, or nothing. Notifications go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use padsync_core::{Presenter, ToastState};
use tracing::warn;

/// Where rendered content goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Print each render to stdout, followed by a separator line
    Stdout,
    /// Overwrite a file with each render
    File(PathBuf),
    /// Drop renders
    Discard,
}

/// Presenter for terminal sessions
pub struct TerminalPresenter {
    target: RenderTarget,
    toast: ToastState,
}

impl TerminalPresenter {
    pub fn new(target: RenderTarget, toast_duration: Duration) -> Self {
        Self {
            target,
            toast: ToastState::new(toast_duration),
        }
    }

    /// Record `message` as the visible toast; false if it was already showing
    fn show_toast(&mut self, message: &str, now: Instant) -> bool {
        let repeated = self.toast.current(now) == Some(message);
        self.toast.dismiss_if_due(now);
        self.toast.show(message, now);
        !repeated
    }
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, content: &str) {
        match &self.target {
            RenderTarget::Stdout => {
                if let Err(e) = print_view(content) {
                    warn!("Failed to write to stdout: {}", e);
                }
            }
            RenderTarget::File(path) => {
                if let Err(e) = std::fs::write(path, content) {
                    warn!("Failed to write view file {:?}: {}", path, e);
                }
            }
            RenderTarget::Discard => {}
        }
    }

    fn notify(&mut self, message: &str) {
        // A repeat of the visible toast only extends it
        if self.show_toast(message, Instant::now()) {
            eprintln!("⚠ {}", message);
        }
    }
}

fn print_view(content: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.write_all(b"----\n")?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target_writes_literal_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.txt");
        let mut presenter =
            TerminalPresenter::new(RenderTarget::File(path.clone()), Duration::from_secs(3));

        presenter.render("<script>alert(1)</script>\nline two");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<script>alert(1)</script>\nline two"
        );
    }

    #[test]
    fn test_repeated_toast_is_collapsed() {
        let mut presenter = TerminalPresenter::new(RenderTarget::Discard, Duration::from_secs(3));
        let start = Instant::now();

        assert!(presenter.show_toast("Failed to save note.", start));
        assert!(!presenter.show_toast("Failed to save note.", start + Duration::from_secs(1)));
        assert!(presenter.show_toast("Storage is overloaded.", start + Duration::from_secs(2)));
        // Expired toasts show again
        assert!(presenter.show_toast("Storage is overloaded.", start + Duration::from_secs(6)));
    }
}
