//! Save scheduling
//!
//! Owns the single debounce deadline and the sequence numbers that tag save
//! requests. It does no I/O; the client asks it when to save and whether a
//! completed save may still be applied.

use std::time::Duration;

use tokio::time::Instant;

/// Autosave interval used when nothing is configured
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(30);

/// When local edits are flushed to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePolicy {
    /// Quiet period after the last edit before an automatic save
    pub delay: Duration,
    /// Save immediately when a line is completed
    pub flush_on_newline: bool,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SAVE_DELAY,
            flush_on_newline: true,
        }
    }
}

impl SavePolicy {
    /// Short debounce without newline flushing
    pub fn debounce(delay: Duration) -> Self {
        Self {
            delay,
            flush_on_newline: false,
        }
    }
}

/// Identifies one issued save request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaveTicket {
    pub seq: u64,
}

/// Debounce timer plus save sequencing
#[derive(Debug)]
pub struct SaveScheduler {
    policy: SavePolicy,
    deadline: Option<Instant>,
    next_seq: u64,
    applied_seq: u64,
    /// Most recently issued save still awaiting its response
    outstanding: Option<(SaveTicket, String)>,
}

impl SaveScheduler {
    pub fn new(policy: SavePolicy) -> Self {
        Self {
            policy,
            deadline: None,
            next_seq: 1,
            applied_seq: 0,
            outstanding: None,
        }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// Arm the timer `delay` after `now`, replacing any pending deadline
    pub fn schedule(&mut self, now: Instant) -> Instant {
        let deadline = now + self.policy.delay;
        self.deadline = Some(deadline);
        deadline
    }

    /// Drop the pending deadline; returns true if one was armed
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Pending deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the newest outstanding request already carries `content`
    pub fn is_outstanding(&self, content: &str) -> bool {
        matches!(&self.outstanding, Some((_, sent)) if sent == content)
    }

    /// Issue the next ticket for a save of `content`
    pub fn begin(&mut self, content: &str) -> SaveTicket {
        let ticket = SaveTicket { seq: self.next_seq };
        self.next_seq += 1;
        self.outstanding = Some((ticket, content.to_string()));
        ticket
    }

    /// Note that the request for `ticket` finished, whatever its outcome
    pub fn finish(&mut self, ticket: SaveTicket) {
        if matches!(&self.outstanding, Some((t, _)) if *t == ticket) {
            self.outstanding = None;
        }
    }

    /// Whether a successful response for `ticket` may still be applied
    ///
    /// False once a newer save has been applied.
    pub fn should_apply(&self, ticket: SaveTicket) -> bool {
        ticket.seq > self.applied_seq
    }

    /// Raise the applied watermark to `ticket`
    pub fn record_applied(&mut self, ticket: SaveTicket) {
        self.applied_seq = self.applied_seq.max(ticket.seq);
    }

    /// Highest sequence number applied so far (0 if none)
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = SavePolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(30));
        assert!(policy.flush_on_newline);

        let debounce = SavePolicy::debounce(Duration::from_millis(800));
        assert!(!debounce.flush_on_newline);
    }

    #[test]
    fn test_schedule_replaces_deadline() {
        let mut scheduler = SaveScheduler::new(SavePolicy::debounce(Duration::from_secs(1)));
        let start = Instant::now();

        scheduler.schedule(start);
        let later = scheduler.schedule(start + Duration::from_millis(400));

        assert_eq!(later, start + Duration::from_millis(1400));
        assert_eq!(scheduler.deadline(), Some(later));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        assert!(scheduler.deadline().is_none());
    }

    #[test]
    fn test_tickets_increase() {
        let mut scheduler = SaveScheduler::new(SavePolicy::default());
        let a = scheduler.begin("a");
        let b = scheduler.begin("b");
        assert!(b > a);
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
    }

    #[test]
    fn test_stale_ticket_is_not_applied() {
        let mut scheduler = SaveScheduler::new(SavePolicy::default());
        let a = scheduler.begin("a");
        let b = scheduler.begin("b");

        assert!(scheduler.should_apply(b));
        scheduler.record_applied(b);

        assert!(!scheduler.should_apply(a));
        scheduler.record_applied(a);
        assert_eq!(scheduler.applied_seq(), b.seq);
    }

    #[test]
    fn test_outstanding_tracks_newest_request() {
        let mut scheduler = SaveScheduler::new(SavePolicy::default());
        let a = scheduler.begin("hello");
        assert!(scheduler.is_outstanding("hello"));

        let b = scheduler.begin("hello world");
        assert!(!scheduler.is_outstanding("hello"));

        // Finishing an older request leaves the newer one outstanding
        scheduler.finish(a);
        assert!(scheduler.is_outstanding("hello world"));
        scheduler.finish(b);
        assert!(!scheduler.is_outstanding("hello world"));
    }
}
