//! Visualization sink contract and the slot the pipeline publishes through.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use market::types::VisualizationRow;

/// Column types understood by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Float,
    Date,
}

/// Ordered column declaration handed to the sink once, at initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkSchema {
    pub columns: Vec<(&'static str, ColumnType)>,
}

impl SinkSchema {
    /// Schema of [`VisualizationRow`].
    pub fn quotes() -> Self {
        Self {
            columns: vec![
                ("stock", ColumnType::String),
                ("top_ask_price", ColumnType::Float),
                ("top_bid_price", ColumnType::Float),
                ("timestamp", ColumnType::Date),
            ],
        }
    }
}

impl Default for SinkSchema {
    fn default() -> Self {
        Self::quotes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    YLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregate {
    #[serde(rename = "avg")]
    Avg,
    #[serde(rename = "distinct count")]
    DistinctCount,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Avg => "avg",
            Self::DistinctCount => "distinct count",
        })
    }
}

/// Display configuration. Set once when a sink is attached; the pipeline
/// never changes it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewConfig {
    pub view: ViewKind,
    pub column_pivots: Vec<&'static str>,
    pub row_pivots: Vec<&'static str>,
    pub columns: Vec<&'static str>,
    pub aggregates: BTreeMap<&'static str, Aggregate>,
}

impl Default for ViewConfig {
    /// Ask price over time, one line per stock.
    fn default() -> Self {
        Self {
            view: ViewKind::YLine,
            column_pivots: vec!["stock"],
            row_pivots: vec!["timestamp"],
            columns: vec!["top_ask_price"],
            aggregates: BTreeMap::from([
                ("stock", Aggregate::DistinctCount),
                ("top_ask_price", Aggregate::Avg),
                ("top_bid_price", Aggregate::Avg),
                ("timestamp", Aggregate::DistinctCount),
            ]),
        }
    }
}

/// External component rendering a pivoted table from rows.
///
/// `update` always receives the complete deduplicated dataset and replaces
/// whatever the sink displayed before.
pub trait VisualizationSink: Send + Sync {
    fn init(&self, schema: &SinkSchema, view: &ViewConfig);

    fn update(&self, rows: Arc<[VisualizationRow]>);

    /// Make the sink visible to the user.
    fn show(&self);
}

struct SlotState {
    sink: Option<Arc<dyn VisualizationSink>>,
    latest: Option<Arc<[VisualizationRow]>>,
}

/// Holder for the (possibly not yet attached) sink.
///
/// Publishing with no sink attached only records the rows. Attaching
/// initialises the sink and hands it the latest rows, if any. Sink calls
/// are made under the slot lock so a sink never sees updates out of order.
#[derive(Clone)]
pub struct SinkSlot {
    schema: Arc<SinkSchema>,
    view: Arc<ViewConfig>,
    state: Arc<Mutex<SlotState>>,
}

impl SinkSlot {
    pub fn new(schema: SinkSchema, view: ViewConfig) -> Self {
        Self {
            schema: Arc::new(schema),
            view: Arc::new(view),
            state: Arc::new(Mutex::new(SlotState {
                sink: None,
                latest: None,
            })),
        }
    }

    pub fn schema(&self) -> &SinkSchema {
        &self.schema
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    /// Attach `sink`, replacing any previous one.
    pub fn attach(&self, sink: Arc<dyn VisualizationSink>) {
        let mut g = self.state.lock();
        sink.init(&self.schema, &self.view);
        if let Some(rows) = &g.latest {
            sink.update(Arc::clone(rows));
        }
        g.sink = Some(sink);
    }

    pub fn detach(&self) -> Option<Arc<dyn VisualizationSink>> {
        self.state.lock().sink.take()
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    /// Show the attached sink. Returns `false` if none is attached.
    pub fn show(&self) -> bool {
        let g = self.state.lock();
        match &g.sink {
            Some(sink) => {
                sink.show();
                true
            }
            None => false,
        }
    }

    /// Record `rows` as the current dataset and push them to the sink.
    /// Returns whether a sink received them.
    pub fn publish(&self, rows: Arc<[VisualizationRow]>) -> bool {
        let mut g = self.state.lock();
        let delivered = match &g.sink {
            Some(sink) => {
                sink.update(Arc::clone(&rows));
                true
            }
            None => false,
        };
        g.latest = Some(rows);
        delivered
    }

    /// Rows most recently published, whether or not a sink was attached.
    pub fn latest(&self) -> Option<Arc<[VisualizationRow]>> {
        self.state.lock().latest.clone()
    }
}

impl Default for SinkSlot {
    fn default() -> Self {
        Self::new(SinkSchema::quotes(), ViewConfig::default())
    }
}

#[derive(Default)]
struct MemorySinkState {
    schema: Option<SinkSchema>,
    view: Option<ViewConfig>,
    visible: bool,
    rows: Option<Arc<[VisualizationRow]>>,
    updates: usize,
}

/// Sink that keeps the last dataset in memory.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<VisualizationRow> {
        self.state
            .lock()
            .rows
            .as_deref()
            .map(<[_]>::to_vec)
            .unwrap_or_default()
    }

    /// Number of `update` calls received.
    pub fn update_count(&self) -> usize {
        self.state.lock().updates
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn schema(&self) -> Option<SinkSchema> {
        self.state.lock().schema.clone()
    }

    pub fn view(&self) -> Option<ViewConfig> {
        self.state.lock().view.clone()
    }
}

impl VisualizationSink for MemorySink {
    fn init(&self, schema: &SinkSchema, view: &ViewConfig) {
        let mut g = self.state.lock();
        g.schema = Some(schema.clone());
        g.view = Some(view.clone());
    }

    fn update(&self, rows: Arc<[VisualizationRow]>) {
        let mut g = self.state.lock();
        g.rows = Some(rows);
        g.updates += 1;
    }

    fn show(&self) {
        self.state.lock().visible = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(stock: &str) -> VisualizationRow {
        VisualizationRow {
            stock: stock.into(),
            top_ask_price: 1.0,
            top_bid_price: 0.5,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn rows(stocks: &[&str]) -> Arc<[VisualizationRow]> {
        stocks.iter().map(|s| row(s)).collect()
    }

    #[test]
    fn publish_without_sink_is_a_noop_that_remembers_rows() {
        let slot = SinkSlot::default();

        assert!(!slot.publish(rows(&["A"])));
        assert!(!slot.show());
        assert_eq!(slot.latest().map(|r| r.len()), Some(1));
    }

    #[test]
    fn late_attach_receives_latest_dataset() {
        let slot = SinkSlot::default();
        slot.publish(rows(&["A", "B"]));

        let sink = Arc::new(MemorySink::new());
        slot.attach(sink.clone());

        assert_eq!(sink.update_count(), 1);
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(sink.schema(), Some(SinkSchema::quotes()));
    }

    #[test]
    fn attach_on_empty_slot_only_initialises() {
        let slot = SinkSlot::default();
        let sink = Arc::new(MemorySink::new());

        slot.attach(sink.clone());

        assert_eq!(sink.update_count(), 0);
        assert_eq!(sink.view(), Some(ViewConfig::default()));
        assert!(slot.is_attached());
    }

    #[test]
    fn publish_replaces_rows() {
        let slot = SinkSlot::default();
        let sink = Arc::new(MemorySink::new());
        slot.attach(sink.clone());

        assert!(slot.publish(rows(&["A", "B", "C"])));
        assert!(slot.publish(rows(&["D"])));

        assert_eq!(sink.update_count(), 2);
        assert_eq!(sink.rows(), vec![row("D")]);
    }

    #[test]
    fn show_and_detach() {
        let slot = SinkSlot::default();
        let sink = Arc::new(MemorySink::new());
        slot.attach(sink.clone());

        assert!(slot.show());
        assert!(sink.is_visible());

        assert!(slot.detach().is_some());
        assert!(!slot.publish(rows(&["A"])));
        assert_eq!(sink.update_count(), 0);
    }

    #[test]
    fn default_view_matches_quote_chart() {
        let view = ViewConfig::default();

        assert_eq!(view.view, ViewKind::YLine);
        assert_eq!(view.column_pivots, ["stock"]);
        assert_eq!(view.row_pivots, ["timestamp"]);
        assert_eq!(view.columns, ["top_ask_price"]);
        assert_eq!(view.aggregates["top_ask_price"], Aggregate::Avg);
        assert_eq!(view.aggregates["timestamp"].to_string(), "distinct count");
        assert_eq!(view.aggregates["top_bid_price"].to_string(), "avg");
    }
}
