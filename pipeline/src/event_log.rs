//! Append-only, in-memory history of every observation received.
//!
//! The log has exactly one writer ([`EventLog`], owned by the pipeline
//! worker) and any number of readers ([`EventLogReader`]). A batch is
//! appended under a single write lock, so readers never observe part of a
//! batch. Observations are never removed or modified once appended.

use std::sync::Arc;

use tokio::sync::RwLock;

use market::types::QuoteObservation;

type Shared = Arc<RwLock<Vec<QuoteObservation>>>;

/// Writer half of the event log.
#[derive(Default)]
pub struct EventLog {
    inner: Shared,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view sharing this log.
    pub fn reader(&self) -> EventLogReader {
        EventLogReader {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Append `batch` in order. Returns `false` (and changes nothing) for an
    /// empty batch.
    pub async fn append(&mut self, batch: Vec<QuoteObservation>) -> bool {
        if batch.is_empty() {
            return false;
        }

        let mut g = self.inner.write().await;
        g.extend(batch);
        true
    }
}

/// Read half of the event log. Cheap to clone.
#[derive(Clone)]
pub struct EventLogReader {
    inner: Shared,
}

impl EventLogReader {
    /// Copy of everything appended so far.
    pub async fn snapshot(&self) -> Vec<QuoteObservation> {
        self.inner.read().await.clone()
    }

    /// Copy of the observations at positions `offset..`.
    pub async fn tail_from(&self, offset: usize) -> Vec<QuoteObservation> {
        let g = self.inner.read().await;
        g.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
