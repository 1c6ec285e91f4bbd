//! Local-edit detection
//!
//! Inbound snapshots are dropped while the user is composing text. What
//! "composing" means is up to the front end, so it is injected as a probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers "is the user actively editing right now?"
pub trait EditingProbe: Send + 'static {
    fn is_editing(&self) -> bool;
}

impl<F> EditingProbe for F
where
    F: Fn() -> bool + Send + 'static,
{
    fn is_editing(&self) -> bool {
        self()
    }
}

/// Focus heuristic: the window has focus and the editor is the active element
///
/// Clones share the same flags, so the front end keeps one copy and the
/// client gets another.
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    window_focused: Arc<AtomicBool>,
    editor_active: Arc<AtomicBool>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_window_focused(&self, focused: bool) {
        self.window_focused.store(focused, Ordering::SeqCst);
    }

    pub fn set_editor_active(&self, active: bool) {
        self.editor_active.store(active, Ordering::SeqCst);
    }

    /// Focus both the window and the editor
    pub fn focus_editor(&self) {
        self.set_window_focused(true);
        self.set_editor_active(true);
    }

    pub fn blur(&self) {
        self.set_editor_active(false);
    }
}

impl EditingProbe for FocusTracker {
    fn is_editing(&self) -> bool {
        self.window_focused.load(Ordering::SeqCst) && self.editor_active.load(Ordering::SeqCst)
    }
}
