pub mod adapter;
pub mod event_log;
pub mod sink;
pub mod stats;
pub mod worker;

pub use adapter::SinkAdapter;
pub use event_log::{EventLog, EventLogReader};
pub use sink::{MemorySink, SinkSchema, SinkSlot, ViewConfig, VisualizationSink};
pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use worker::{BatchSender, PipelineHandle};
