//! Turns the event log into the sink's dataset: dedupe, project, replace.

use std::sync::Arc;

use tracing::debug;

use market::dedup::{DedupIndex, dedupe};
use market::projector::{project, project_all};
use market::types::{QuoteObservation, VisualizationRow};

use crate::event_log::EventLogReader;
use crate::sink::SinkSlot;

/// Rows the sink should display for a given log snapshot.
pub fn render(snapshot: &[QuoteObservation]) -> Vec<VisualizationRow> {
    project_all(dedupe(snapshot))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Log records read in this refresh.
    pub scanned: usize,
    /// Of those, records that were first with their key.
    pub admitted: usize,
    pub total_rows: usize,
    /// Whether an attached sink received the rows.
    pub delivered: bool,
}

/// Keeps the deduplicated, projected view of the log and publishes it.
///
/// The log is append-only, so each refresh only reads records past the last
/// position seen. The published rows always equal [`render`] of the full
/// log.
pub struct SinkAdapter {
    index: DedupIndex,
    rows: Vec<VisualizationRow>,
    processed: usize,
    slot: SinkSlot,
}

impl SinkAdapter {
    pub fn new(slot: SinkSlot) -> Self {
        Self {
            index: DedupIndex::new(),
            rows: Vec::new(),
            processed: 0,
            slot,
        }
    }

    pub fn rows(&self) -> &[VisualizationRow] {
        &self.rows
    }

    /// Bring the view up to date with `log` and push the complete row set.
    pub async fn refresh(&mut self, log: &EventLogReader) -> RefreshOutcome {
        let tail = log.tail_from(self.processed).await;
        self.processed += tail.len();

        let before = self.rows.len();
        for obs in &tail {
            if self.index.admit(obs) {
                self.rows.push(project(obs));
            }
        }
        let admitted = self.rows.len() - before;

        let delivered = self.slot.publish(Arc::from(self.rows.as_slice()));

        debug!(
            scanned = tail.len(),
            admitted,
            duplicates = tail.len() - admitted,
            total_rows = self.rows.len(),
            delivered,
            "sink refreshed"
        );

        RefreshOutcome {
            scanned: tail.len(),
            admitted,
            total_rows: self.rows.len(),
            delivered,
        }
    }
}
