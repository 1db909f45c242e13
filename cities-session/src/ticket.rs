use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Sequence number attached to an action when it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

/// Shared, monotonically increasing ticket counter.
///
/// A session only publishes the outcome of an action whose ticket is still the
/// latest one issued; anything older has been superseded by an action waiting
/// behind it.
#[derive(Debug, Clone, Default)]
pub struct QueryTickets {
    latest: Arc<AtomicU64>,
}

impl QueryTickets {
    /// Issue a new ticket, superseding every earlier one.
    #[must_use]
    pub fn issue(&self) -> QueryTicket {
        let previous = self.latest.fetch_add(1, Ordering::SeqCst);
        QueryTicket(previous.wrapping_add(1))
    }

    /// The most recently issued ticket.
    #[must_use]
    pub fn current(&self) -> QueryTicket {
        QueryTicket(self.latest.load(Ordering::SeqCst))
    }

    /// Whether `ticket` has not been superseded.
    #[must_use]
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.current() == ticket
    }
}
