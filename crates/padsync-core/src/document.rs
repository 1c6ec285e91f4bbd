//! Document state
//!
//! Tracks two versions of the note: the text the user is editing now and the
//! last text known to match the server. Everything else in the sync layer
//! asks this type whether an update is meaningful.
//!
//! `last_synced` moves at exactly two points: after a save completes
//! successfully and after an inbound snapshot is accepted.

/// Editable content plus the last content confirmed by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    editable: String,
    last_synced: String,
}

impl DocumentState {
    /// Start from content loaded from the server; both versions agree
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            editable: initial.clone(),
            last_synced: initial,
        }
    }

    /// Content the user currently sees and edits
    pub fn editable(&self) -> &str {
        &self.editable
    }

    /// Last content saved to, or received fresh from, the server
    pub fn last_synced(&self) -> &str {
        &self.last_synced
    }

    /// Replace the editable content (local input)
    pub fn set_editable(&mut self, content: impl Into<String>) {
        self.editable = content.into();
    }

    /// Append to the editable content (local input)
    pub fn append(&mut self, text: &str) {
        self.editable.push_str(text);
    }

    /// Whether the editable content differs from the server copy
    ///
    /// Surrounding whitespace is not considered a change.
    pub fn needs_save(&self) -> bool {
        normalize(&self.editable) != normalize(&self.last_synced)
    }

    /// Whether `content` is exactly what the editor already shows
    pub fn is_current(&self, content: &str) -> bool {
        self.editable == content
    }

    /// Take an inbound snapshot as the new content of both versions
    pub fn accept_snapshot(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.editable = content.clone();
        self.last_synced = content;
    }

    /// Advance the baseline after a successful save of `content`
    pub fn mark_saved(&mut self, content: impl Into<String>) {
        self.last_synced = content.into();
    }
}

/// Normalization used for "has anything meaningful changed" checks
pub fn normalize(content: &str) -> &str {
    content.trim()
}
