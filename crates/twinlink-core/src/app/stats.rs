//! Counters describing what happened to submitted commands.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::RequestState;

#[derive(Debug, Default)]
pub struct CorrelatorStats {
    registered: AtomicU64,
    acknowledged: AtomicU64,
    remote_failures: AtomicU64,
    timeouts: AtomicU64,
    cancelled: AtomicU64,
    dispatch_failures: AtomicU64,
    closed: AtomicU64,
    /// Responses whose token was unknown (late, duplicate, or never issued).
    dropped_responses: AtomicU64,
}

impl CorrelatorStats {
    pub(crate) fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_response(&self) {
        self.dropped_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, state: RequestState) {
        let counter = match state {
            RequestState::Pending => return,
            RequestState::Acknowledged => &self.acknowledged,
            RequestState::RemoteFailed => &self.remote_failures,
            RequestState::TimedOut => &self.timeouts,
            RequestState::Cancelled => &self.cancelled,
            RequestState::DispatchFailed => &self.dispatch_failures,
            RequestState::Closed => &self.closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pending: usize) -> StatsSnapshot {
        StatsSnapshot {
            pending,
            registered: self.registered.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            dropped_responses: self.dropped_responses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub pending: usize,
    pub registered: u64,
    pub acknowledged: u64,
    pub remote_failures: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub dispatch_failures: u64,
    pub closed: u64,
    pub dropped_responses: u64,
}

impl StatsSnapshot {
    /// Requests that reached a terminal state.
    pub fn resolved(&self) -> u64 {
        self.acknowledged
            + self.remote_failures
            + self.timeouts
            + self.cancelled
            + self.dispatch_failures
            + self.closed
    }
}
