use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instant attached to every quote. Totally ordered; only compared, never
/// interpreted by the pipeline.
pub type Timestamp = DateTime<Utc>;

/// One side of the top of book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

impl PriceLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// A single timestamped bid/ask snapshot for one stock, as received from
/// the data source.
///
/// Observations are never mutated once they enter the event log; the log
/// hands out clones. `stock` is reference counted so cloning (and dedup
/// keys) stay cheap while the log grows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteObservation {
    pub stock: Arc<str>,
    pub top_ask: Option<PriceLevel>,
    pub top_bid: Option<PriceLevel>,
    pub timestamp: Timestamp,
}

impl QuoteObservation {
    pub fn new(stock: impl Into<Arc<str>>, timestamp: Timestamp) -> Self {
        Self {
            stock: stock.into(),
            top_ask: None,
            top_bid: None,
            timestamp,
        }
    }

    pub fn with_ask(mut self, price: f64, size: f64) -> Self {
        self.top_ask = Some(PriceLevel::new(price, size));
        self
    }

    pub fn with_bid(mut self, price: f64, size: f64) -> Self {
        self.top_bid = Some(PriceLevel::new(price, size));
        self
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            stock: Arc::clone(&self.stock),
            timestamp: self.timestamp,
        }
    }
}

/// Identity of an observation for deduplication: `(stock, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub stock: Arc<str>,
    pub timestamp: Timestamp,
}

/// Row in the fixed visualization schema.
///
/// Field names are the sink's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationRow {
    pub stock: String,
    pub top_ask_price: f64,
    pub top_bid_price: f64,
    pub timestamp: Timestamp,
}
