//! Single-writer loop feeding the event log.
//!
//! Fetch tasks send batches into a bounded channel; one worker task appends
//! each batch to the log and, for non-empty batches, refreshes the sink.
//! The worker exits once every sender is dropped, which happens after the
//! poller is gone and its in-flight requests have completed.

use std::sync::atomic::Ordering;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use market::types::QuoteObservation;

use crate::adapter::SinkAdapter;
use crate::event_log::{EventLog, EventLogReader};
use crate::sink::SinkSlot;
use crate::stats::{PipelineStats, PipelineStatsSnapshot};

pub type BatchSender = mpsc::Sender<Vec<QuoteObservation>>;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

async fn run_pipeline(
    mut batch_rx: mpsc::Receiver<Vec<QuoteObservation>>,
    mut log: EventLog,
    mut adapter: SinkAdapter,
    stats: PipelineStats,
) {
    let reader = log.reader();

    info!("pipeline worker started");

    while let Some(batch) = batch_rx.recv().await {
        let records = batch.len() as u64;

        if !log.append(batch).await {
            stats.empty_batches.fetch_add(1, Ordering::Relaxed);
            debug!("empty batch ignored");
            continue;
        }

        stats.batches_appended.fetch_add(1, Ordering::Relaxed);
        stats.records_appended.fetch_add(records, Ordering::Relaxed);

        let out = adapter.refresh(&reader).await;

        stats.refreshes.fetch_add(1, Ordering::Relaxed);
        stats
            .rows_published
            .store(out.total_rows as u64, Ordering::Relaxed);
        if out.delivered {
            stats.sink_deliveries.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.sink_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    let log_len = reader.len().await;
    info!(
        log_len,
        rows = adapter.rows().len(),
        "pipeline worker drained"
    );
}

/// Running pipeline: event log, sink adapter and the worker task.
pub struct PipelineHandle {
    batch_tx: BatchSender,
    log: EventLogReader,
    slot: SinkSlot,
    stats: PipelineStats,
    worker: JoinHandle<()>,
}

impl PipelineHandle {
    /// Spawn the worker with an empty log publishing through `slot`.
    pub fn spawn(slot: SinkSlot, queue_capacity: usize) -> Self {
        let (batch_tx, batch_rx) = mpsc::channel(queue_capacity.max(1));
        let log = EventLog::new();
        let reader = log.reader();
        let stats = PipelineStats::default();
        let adapter = SinkAdapter::new(slot.clone());

        let worker = tokio::spawn(
            run_pipeline(batch_rx, log, adapter, stats.clone())
                .instrument(tracing::info_span!("pipeline")),
        );

        Self {
            batch_tx,
            log: reader,
            slot,
            stats,
            worker,
        }
    }

    /// Sender for batch producers.
    pub fn sender(&self) -> BatchSender {
        self.batch_tx.clone()
    }

    pub fn log(&self) -> &EventLogReader {
        &self.log
    }

    pub fn sink(&self) -> &SinkSlot {
        &self.slot
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Drop this handle's sender and wait until every other sender is gone
    /// and all queued batches are applied.
    pub async fn shutdown(self) -> anyhow::Result<PipelineStatsSnapshot> {
        let Self {
            batch_tx,
            stats,
            worker,
            ..
        } = self;
        drop(batch_tx);

        worker.await.context("pipeline worker panicked")?;

        Ok(stats.snapshot())
    }
}
