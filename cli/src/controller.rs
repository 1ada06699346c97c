use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use market::feed::DataSource;
use pipeline::{
    EventLogReader, PipelineHandle, PipelineStatsSnapshot, SinkSchema, SinkSlot, ViewConfig,
    VisualizationSink,
};
use scheduler::{Poller, PollerConfig, PollerState, PollerStatsSnapshot, SchedulerError};

use crate::config::StreamConfig;

/// Final counters reported at shutdown.
#[derive(Debug, Clone, Copy)]
pub struct StreamSummary {
    pub poller: PollerStatsSnapshot,
    pub pipeline: PipelineStatsSnapshot,
    /// False when the drain timed out and in-flight requests were abandoned.
    pub drained: bool,
}

/// Wires a source, the pipeline and a sink together behind start/stop.
pub struct StreamController<S: DataSource> {
    pipeline: PipelineHandle,
    poller: Poller<S>,
}

impl<S: DataSource> StreamController<S> {
    pub fn new(source: Arc<S>, sink: Arc<dyn VisualizationSink>, cfg: &StreamConfig) -> Self {
        let slot = SinkSlot::new(SinkSchema::quotes(), ViewConfig::default());
        slot.attach(sink);

        let pipeline = PipelineHandle::spawn(slot, cfg.queue_capacity);
        let poller = Poller::new(
            source,
            pipeline.sender(),
            PollerConfig {
                interval: cfg.poll_interval,
                ordering: cfg.ordering,
                request_timeout: cfg.request_timeout,
                ..PollerConfig::default()
            },
        );

        Self { pipeline, poller }
    }

    /// Show the sink, then begin polling.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.pipeline.sink().show();
        self.poller.start()?;
        info!(
            interval_ms = self.poller.config().interval.as_millis() as u64,
            ordering = %self.poller.config().ordering,
            "streaming started"
        );
        Ok(())
    }

    /// Stop issuing requests. Outstanding ones still land in the log.
    pub fn stop(&self) -> bool {
        let stopped = self.poller.stop();
        if stopped {
            info!(in_flight = self.poller.in_flight(), "streaming stopped");
        }
        stopped
    }

    pub fn state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn log(&self) -> &EventLogReader {
        self.pipeline.log()
    }

    /// Stop, give in-flight requests up to `grace` to land, then close the
    /// pipeline.
    pub async fn shutdown(self, grace: Duration) -> anyhow::Result<StreamSummary> {
        self.stop();

        let Self { pipeline, poller } = self;
        let drained = tokio::time::timeout(grace, poller.drain()).await.is_ok();
        let poller_stats = poller.stats();

        let pipeline_stats = if drained {
            drop(poller);
            pipeline.shutdown().await?
        } else {
            warn!(
                in_flight = poller.in_flight(),
                "drain timed out, abandoning in-flight requests"
            );
            pipeline.stats()
        };

        Ok(StreamSummary {
            poller: poller_stats,
            pipeline: pipeline_stats,
            drained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use market::feed::SourceError;
    use market::types::QuoteObservation;
    use pipeline::MemorySink;

    /// Returns a single fresh quote per call, then hangs after `limit`.
    struct Counting {
        calls: AtomicU64,
        limit: u64,
    }

    #[async_trait]
    impl DataSource for Counting {
        async fn get_data(&self) -> Result<Vec<QuoteObservation>, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.limit {
                std::future::pending::<()>().await;
            }
            let ts = Utc.with_ymd_and_hms(2019, 2, 1, 9, 0, n as u32).unwrap();
            Ok(vec![
                QuoteObservation::new("ABC", ts).with_ask(10.0, 1.0),
            ])
        }
    }

    fn cfg() -> StreamConfig {
        StreamConfig {
            poll_interval: Duration::from_millis(100),
            drain_timeout: Duration::from_millis(50),
            ..StreamConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_shows_sink_and_streams() -> anyhow::Result<()> {
        let sink = Arc::new(MemorySink::new());
        let source = Arc::new(Counting {
            calls: AtomicU64::new(0),
            limit: u64::MAX,
        });
        let controller = StreamController::new(source, sink.clone(), &cfg());

        controller.start()?;
        assert!(sink.is_visible());
        assert_eq!(controller.state(), PollerState::Streaming);
        assert_eq!(controller.start(), Err(SchedulerError::AlreadyStreaming));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(controller.stop());
        assert!(!controller.stop());

        let summary = controller.shutdown(Duration::from_secs(1)).await?;

        assert!(summary.drained);
        assert_eq!(summary.poller.ticks, 3);
        assert_eq!(summary.pipeline.records_appended, 3);
        assert_eq!(sink.rows().len(), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_gives_up_on_hung_requests() -> anyhow::Result<()> {
        let sink = Arc::new(MemorySink::new());
        let source = Arc::new(Counting {
            calls: AtomicU64::new(0),
            limit: 1,
        });
        let controller = StreamController::new(source, sink.clone(), &cfg());

        controller.start()?;
        tokio::time::sleep(Duration::from_millis(250)).await;

        let summary = controller.shutdown(Duration::from_millis(50)).await?;

        assert!(!summary.drained);
        assert_eq!(summary.pipeline.records_appended, 1);
        Ok(())
    }
}
