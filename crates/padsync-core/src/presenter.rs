//! Presentation interface
//!
//! The sync layer never draws anything itself. It hands content to a
//! [`Presenter`] for the read-only view and raises transient notifications
//! through the same object.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a notification stays visible
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

/// Output side of a sync session
pub trait Presenter: Send + 'static {
    /// Replace the read-only view with exactly `content`
    ///
    /// Content is literal text and must never be interpreted as markup.
    fn render(&mut self, content: &str);

    /// Show a transient notification, replacing any visible one
    fn notify(&mut self, message: &str);
}

/// Single-slot notification with a dismissal deadline
#[derive(Debug, Clone)]
pub struct ToastState {
    duration: Duration,
    active: Option<(String, Instant)>,
}

impl Default for ToastState {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl ToastState {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: None,
        }
    }

    /// Show `message`, resetting the dismissal deadline
    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.active = Some((message.into(), now + self.duration));
    }

    /// Message visible at `now`, if any
    pub fn current(&self, now: Instant) -> Option<&str> {
        match &self.active {
            Some((message, until)) if now < *until => Some(message),
            _ => None,
        }
    }

    /// Clear the toast once its deadline passed; returns true if it was cleared
    pub fn dismiss_if_due(&mut self, now: Instant) -> bool {
        let due = matches!(&self.active, Some((_, until)) if now >= *until);
        if due {
            self.active = None;
        }
        due
    }

    /// Deadline of the visible toast
    pub fn deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|(_, until)| *until)
    }
}

/// What a [`RecordingPresenter`] has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recorded {
    pub renders: Vec<String>,
    pub notifications: Vec<String>,
}

/// Presenter that records every call
///
/// Clones share the same record, so one copy can be handed to a client while
/// another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn recorded(&self) -> Recorded {
        self.inner.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Most recent render
    pub fn last_render(&self) -> Option<String> {
        self.recorded().renders.last().cloned()
    }

    /// Most recent notification
    pub fn last_notification(&self) -> Option<String> {
        self.recorded().notifications.last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, content: &str) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.renders.push(content.to_string());
        }
    }

    fn notify(&mut self, message: &str) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.notifications.push(message.to_string());
        }
    }
}
