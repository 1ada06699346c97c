//! Configuration and counters for the poller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::policy::OrderingPolicy;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_SLOW_REQUEST: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed tick period. The first tick fires one period after `start`.
    pub interval: Duration,

    pub ordering: OrderingPolicy,

    /// Abandon a request that has not resolved within this long. `None`
    /// waits forever; a source that never answers then simply keeps a slot
    /// occupied.
    pub request_timeout: Option<Duration>,

    /// Requests slower than this are logged as warnings.
    pub slow_request: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ordering: OrderingPolicy::default(),
            request_timeout: None,
            slow_request: DEFAULT_SLOW_REQUEST,
        }
    }
}

/// Poller counters. Shared between the ticker and fetch tasks.
#[derive(Clone, Default, Debug)]
pub struct PollerStats {
    pub ticks: Arc<AtomicU64>,
    pub skipped_ticks: Arc<AtomicU64>,
    pub requests_issued: Arc<AtomicU64>,
    pub peak_in_flight: Arc<AtomicU64>,

    pub batches_forwarded: Arc<AtomicU64>,
    pub records_forwarded: Arc<AtomicU64>,
    pub empty_batches: Arc<AtomicU64>,

    // failures
    pub source_errors: Arc<AtomicU64>,
    pub timeouts: Arc<AtomicU64>,
    pub undelivered: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PollerStatsSnapshot {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub requests_issued: u64,
    pub peak_in_flight: u64,
    pub batches_forwarded: u64,
    pub records_forwarded: u64,
    pub empty_batches: u64,
    pub source_errors: u64,
    pub timeouts: u64,
    /// Batches received after the pipeline closed.
    pub undelivered: u64,
}

impl PollerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PollerStatsSnapshot {
        let r = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PollerStatsSnapshot {
            ticks: r(&self.ticks),
            skipped_ticks: r(&self.skipped_ticks),
            requests_issued: r(&self.requests_issued),
            peak_in_flight: r(&self.peak_in_flight),
            batches_forwarded: r(&self.batches_forwarded),
            records_forwarded: r(&self.records_forwarded),
            empty_batches: r(&self.empty_batches),
            source_errors: r(&self.source_errors),
            timeouts: r(&self.timeouts),
            undelivered: r(&self.undelivered),
        }
    }
}
