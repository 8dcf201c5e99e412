//! # Refresh Tickets
//!
//! Cooperative cancellation through optimistic versioning: every dispatched
//! attempt takes a ticket, and a result may only commit while its ticket is
//! still the latest one handed out for its stream.
//!
//! ```text
//!   dispatch R1 ─► ticket 1 ──────────────────────────► arrives: 1 < 3, dropped
//!   dispatch R2 ─► ticket 2 ─────────► arrives: 2 < 3, dropped
//!   dispatch R3 ─► ticket 3 ───► arrives: 3 == 3, commits
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one dispatched resolution or fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RefreshTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ticket source for one logical stream.
#[derive(Debug, Default)]
pub struct TicketCounter {
    latest: AtomicU64,
}

impl TicketCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a new ticket, superseding every earlier one.
    pub fn next(&self) -> RefreshTicket {
        RefreshTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently dispatched ticket (0 before the first dispatch).
    pub fn latest(&self) -> RefreshTicket {
        RefreshTicket(self.latest.load(Ordering::Acquire))
    }

    /// Strictly-newest-wins check performed at commit time.
    pub fn is_latest(&self, ticket: RefreshTicket) -> bool {
        self.latest() == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_are_monotonic() {
        let counter = TicketCounter::new();
        let first = counter.next();
        let second = counter.next();
        assert!(second > first);
        assert_eq!(counter.latest(), second);
    }

    #[test]
    fn test_only_latest_ticket_commits() {
        let counter = TicketCounter::new();
        let r1 = counter.next();
        let r2 = counter.next();
        assert!(!counter.is_latest(r1));
        assert!(counter.is_latest(r2));
    }
}
