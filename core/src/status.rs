//! Fetch lifecycle shared by all stores
//!
//! Every fetch moves `Idle -> Loading -> {Ready, Failed}`. Requests are
//! ticketed so that only the most recently issued one may write its result.

use std::sync::atomic::{AtomicU64, Ordering};

/// Progress of one fetch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Never run, or reset
    #[default]
    Idle,
    /// Request in flight
    Loading,
    /// Last request succeeded
    Ready,
    /// Last request failed
    Failed,
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchStatus::Loading)
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStatus::Idle => write!(f, "idle"),
            FetchStatus::Loading => write!(f, "loading"),
            FetchStatus::Ready => write!(f, "ready"),
            FetchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Ticket identifying one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Monotonic request counter for one operation
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket; every earlier ticket becomes stale
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Make every outstanding ticket stale
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether `ticket` is still the latest issued
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}
