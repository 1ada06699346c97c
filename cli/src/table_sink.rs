//! Console sink: logs a compact pivot of every dataset it is handed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use market::types::VisualizationRow;
use pipeline::{SinkSchema, ViewConfig, VisualizationSink};

/// Per-stock aggregate over one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSummary {
    pub stock: String,
    pub points: usize,
    pub avg_ask: f64,
    pub avg_bid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub distinct_timestamps: usize,
    pub stocks: Vec<StockSummary>,
}

/// Pivot rows by stock, averaging both sides of the book.
pub fn summarize(rows: &[VisualizationRow]) -> TableSummary {
    let mut by_stock: BTreeMap<&str, (usize, f64, f64)> = BTreeMap::new();
    let mut timestamps = BTreeSet::new();

    for row in rows {
        let entry = by_stock.entry(row.stock.as_str()).or_default();
        entry.0 += 1;
        entry.1 += row.top_ask_price;
        entry.2 += row.top_bid_price;
        timestamps.insert(row.timestamp);
    }

    let stocks = by_stock
        .into_iter()
        .map(|(stock, (n, ask, bid))| StockSummary {
            stock: stock.to_string(),
            points: n,
            avg_ask: ask / n as f64,
            avg_bid: bid / n as f64,
        })
        .collect();

    TableSummary {
        rows: rows.len(),
        distinct_timestamps: timestamps.len(),
        stocks,
    }
}

#[derive(Default)]
struct TableState {
    visible: bool,
    latest: Option<TableSummary>,
}

/// Hidden until `show`; datasets received while hidden are summarised but
/// not logged.
#[derive(Default)]
pub struct TableSink {
    state: Mutex<TableState>,
}

impl TableSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<TableSummary> {
        self.state.lock().latest.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn render(summary: &TableSummary) {
        info!(
            rows = summary.rows,
            stocks = summary.stocks.len(),
            timestamps = summary.distinct_timestamps,
            "table updated"
        );
        for s in &summary.stocks {
            debug!(
                stock = %s.stock,
                points = s.points,
                avg_ask = s.avg_ask,
                avg_bid = s.avg_bid,
                "pivot"
            );
        }
    }
}

impl VisualizationSink for TableSink {
    fn init(&self, schema: &SinkSchema, view: &ViewConfig) {
        let columns: Vec<&str> = schema.columns.iter().map(|(name, _)| *name).collect();
        info!(?columns, view = ?view.view, "table sink initialised");
    }

    fn update(&self, rows: Arc<[VisualizationRow]>) {
        let summary = summarize(&rows);
        let mut state = self.state.lock();
        if state.visible {
            Self::render(&summary);
        }
        state.latest = Some(summary);
    }

    fn show(&self) {
        let mut state = self.state.lock();
        if state.visible {
            return;
        }
        state.visible = true;
        if let Some(summary) = &state.latest {
            Self::render(summary);
        }
    }
}
