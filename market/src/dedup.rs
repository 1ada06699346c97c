//! First-occurrence-wins deduplication on `(stock, timestamp)`.
//!
//! The event log itself keeps every observation it receives; uniqueness is
//! only enforced on the view built from it. Two forms are provided:
//!
//! - [`dedupe`]: pure function over a whole sequence.
//! - [`DedupIndex`]: the same rule applied incrementally, for callers that
//!   walk an append-only log tail by tail.
//!
//! Folding a full sequence through a fresh `DedupIndex` keeps exactly the
//! elements `dedupe` keeps.

use std::collections::HashSet;

use crate::types::{DedupKey, QuoteObservation};

/// Anything that can be identified by a [`DedupKey`].
pub trait Deduplicatable {
    fn unique_key(&self) -> DedupKey;
}

impl Deduplicatable for QuoteObservation {
    fn unique_key(&self) -> DedupKey {
        self.dedup_key()
    }
}

impl<T: Deduplicatable + ?Sized> Deduplicatable for &T {
    fn unique_key(&self) -> DedupKey {
        (**self).unique_key()
    }
}

/// Keep the first element for every key, preserving relative order.
///
/// Works on owned values or references:
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use market::{dedup::dedupe, types::QuoteObservation};
///
/// let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
/// let log = vec![
///     QuoteObservation::new("AAPL", t1).with_ask(100.0, 1.0),
///     QuoteObservation::new("AAPL", t1).with_ask(101.0, 1.0),
/// ];
///
/// let view = dedupe(&log);
/// assert_eq!(view.len(), 1);
/// assert_eq!(view[0].top_ask.unwrap().price, 100.0);
/// ```
pub fn dedupe<T, I>(items: I) -> Vec<T>
where
    T: Deduplicatable,
    I: IntoIterator<Item = T>,
{
    let iter = items.into_iter();
    let mut index = DedupIndex::with_capacity(iter.size_hint().0);

    iter.filter(|item| index.admit(item)).collect()
}

/// Set of keys already admitted into a deduplicated view.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    seen: HashSet<DedupKey>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `true` if `item` is the first with its key, recording the key.
    pub fn admit<T: Deduplicatable + ?Sized>(&mut self, item: &T) -> bool {
        self.seen.insert(item.unique_key())
    }

    pub fn contains<T: Deduplicatable + ?Sized>(&self, item: &T) -> bool {
        self.seen.contains(&item.unique_key())
    }

    /// Number of distinct keys admitted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
