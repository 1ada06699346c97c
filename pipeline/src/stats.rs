use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the pipeline worker.
#[derive(Clone, Default, Debug)]
pub struct PipelineStats {
    pub batches_appended: Arc<AtomicU64>,
    pub records_appended: Arc<AtomicU64>,
    pub empty_batches: Arc<AtomicU64>,

    pub refreshes: Arc<AtomicU64>,
    pub rows_published: Arc<AtomicU64>,
    pub sink_deliveries: Arc<AtomicU64>,
    pub sink_missing: Arc<AtomicU64>,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    pub batches_appended: u64,
    pub records_appended: u64,
    pub empty_batches: u64,
    pub refreshes: u64,
    /// Row count of the last published dataset.
    pub rows_published: u64,
    pub sink_deliveries: u64,
    pub sink_missing: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        let r = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineStatsSnapshot {
            batches_appended: r(&self.batches_appended),
            records_appended: r(&self.records_appended),
            empty_batches: r(&self.empty_batches),
            refreshes: r(&self.refreshes),
            rows_published: r(&self.rows_published),
            sink_deliveries: r(&self.sink_deliveries),
            sink_missing: r(&self.sink_missing),
        }
    }
}
