use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::time::sleep;

use market::types::{QuoteObservation, Timestamp};
use pipeline::{MemorySink, PipelineHandle, SinkSlot};
use scheduler::{OrderingPolicy, Poller, PollerConfig, PollerState, SchedulerError};

use scripted_source::{ScriptedSource, Step};

fn t(sec: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2019, 2, 11, 22, 6, sec).unwrap()
}

fn quote(stock: &str, sec: u32) -> QuoteObservation {
    QuoteObservation::new(stock, t(sec)).with_ask(100.0, 1.0)
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

struct Harness {
    pipeline: PipelineHandle,
    sink: Arc<MemorySink>,
    poller: Poller<ScriptedSource>,
}

fn harness(steps: Vec<Step>, cfg: PollerConfig) -> Harness {
    let slot = SinkSlot::default();
    let sink = Arc::new(MemorySink::new());
    slot.attach(sink.clone());

    let pipeline = PipelineHandle::spawn(slot, 64);
    let poller = Poller::new(Arc::new(ScriptedSource::new(steps)), pipeline.sender(), cfg);

    Harness {
        pipeline,
        sink,
        poller,
    }
}

impl Harness {
    /// Stop, wait for in-flight requests, and flush the pipeline. Returns the
    /// stock ids in log order.
    async fn finish(self) -> anyhow::Result<(Vec<String>, Arc<MemorySink>)> {
        self.poller.stop();
        self.poller.drain().await;
        drop(self.poller);

        let log = self.pipeline.log().clone();
        self.pipeline.shutdown().await?;

        let stocks: Vec<String> = log
            .snapshot()
            .await
            .iter()
            .map(|o| o.stock.to_string())
            .collect();
        Ok((stocks, self.sink))
    }
}

#[tokio::test(start_paused = true)]
async fn issues_one_request_per_interval() -> anyhow::Result<()> {
    let h = harness(
        vec![
            Step::now(vec![quote("A", 0)]),
            Step::now(vec![quote("B", 0)]),
            Step::now(vec![quote("C", 0)]),
        ],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(50)).await;
    assert_eq!(h.poller.stats().requests_issued, 0, "first tick is one interval out");

    sleep(ms(300)).await;
    let stats = h.poller.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.requests_issued, 3);
    assert_eq!(stats.batches_forwarded, 3);

    let (stocks, sink) = h.finish().await?;
    assert_eq!(stocks, ["A", "B", "C"]);
    assert_eq!(sink.rows().len(), 3);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn in_flight_request_still_appends_after_stop() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::after(500, vec![quote("AAPL", 1)])],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(150)).await;

    assert!(h.poller.stop());
    assert_eq!(h.poller.state(), PollerState::Stopped);
    assert_eq!(h.poller.in_flight(), 1);
    assert!(h.pipeline.log().is_empty().await);

    sleep(ms(1_000)).await;
    assert_eq!(h.poller.stats().ticks, 1, "no ticks after stop");

    let (stocks, sink) = h.finish().await?;
    assert_eq!(stocks, ["AAPL"]);
    assert_eq!(sink.rows().len(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_land_in_completion_order() -> anyhow::Result<()> {
    let h = harness(
        vec![
            Step::after(250, vec![quote("SLOW", 0)]),
            Step::after(10, vec![quote("FAST", 0)]),
        ],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(250)).await;

    let stats = h.poller.stats();
    assert_eq!(stats.requests_issued, 2);
    assert_eq!(stats.peak_in_flight, 2);

    let (stocks, _) = h.finish().await?;
    assert_eq!(stocks, ["FAST", "SLOW"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn serialized_requests_land_in_issue_order() -> anyhow::Result<()> {
    let h = harness(
        vec![
            Step::after(250, vec![quote("SLOW", 0)]),
            Step::after(10, vec![quote("FAST", 0)]),
        ],
        PollerConfig {
            ordering: OrderingPolicy::Serialized,
            ..PollerConfig::default()
        },
    );

    h.poller.start()?;
    sleep(ms(450)).await;

    // 100: SLOW issued (done at 350), 200 and 300 skipped, 400: FAST issued.
    let stats = h.poller.stats();
    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.skipped_ticks, 2);
    assert_eq!(stats.requests_issued, 2);
    assert_eq!(stats.peak_in_flight, 1);

    let (stocks, _) = h.finish().await?;
    assert_eq!(stocks, ["SLOW", "FAST"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lifecycle_transitions_and_restart_keep_the_log() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::now(vec![quote("X", 0)]), Step::now(vec![quote("Y", 1)])],
        PollerConfig::default(),
    );

    assert_eq!(h.poller.state(), PollerState::Idle);
    assert!(!h.poller.stop(), "stopping an idle poller is a no-op");

    h.poller.start()?;
    assert_eq!(h.poller.start(), Err(SchedulerError::AlreadyStreaming));
    sleep(ms(150)).await;
    assert!(h.poller.stop());
    h.poller.drain().await;

    assert_eq!(h.pipeline.log().len().await, 1);

    h.poller.start()?;
    assert_eq!(h.poller.state(), PollerState::Streaming);
    sleep(ms(150)).await;

    assert_eq!(h.poller.stats().requests_issued, 2);

    let (stocks, _) = h.finish().await?;
    assert_eq!(stocks, ["X", "Y"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn silent_source_does_not_stall_ticks() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::Hang, Step::Hang, Step::Hang],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(350)).await;

    let stats = h.poller.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.requests_issued, 3);
    assert_eq!(h.poller.in_flight(), 3);
    assert!(h.pipeline.log().is_empty().await);

    assert!(h.poller.stop());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hung_requests_are_abandoned_after_timeout() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::Hang, Step::Hang, Step::Hang],
        PollerConfig {
            request_timeout: Some(ms(50)),
            ..PollerConfig::default()
        },
    );

    h.poller.start()?;
    sleep(ms(380)).await;

    let stats = h.poller.stats();
    assert_eq!(stats.timeouts, 3);
    assert_eq!(h.poller.in_flight(), 0);

    let (stocks, _) = h.finish().await?;
    assert!(stocks.is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn source_errors_are_counted_and_polling_continues() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::Fail, Step::now(vec![quote("OK", 0)])],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(250)).await;

    let stats = h.poller.stats();
    assert_eq!(stats.source_errors, 1);
    assert_eq!(stats.batches_forwarded, 1);

    let (stocks, _) = h.finish().await?;
    assert_eq!(stocks, ["OK"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn exhausted_source_yields_no_sink_updates() -> anyhow::Result<()> {
    let h = harness(Vec::new(), PollerConfig::default());

    h.poller.start()?;
    sleep(ms(550)).await;

    assert_eq!(h.poller.stats().empty_batches, 5);

    let (stocks, sink) = h.finish().await?;
    assert!(stocks.is_empty());
    assert_eq!(sink.update_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn repeated_quote_is_rendered_once() -> anyhow::Result<()> {
    let h = harness(
        vec![
            Step::now(vec![quote("AAPL", 1)]),
            Step::now(vec![quote("AAPL", 1)]),
            Step::now(vec![quote("AAPL", 1), quote("AAPL", 2)]),
        ],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(350)).await;

    let (stocks, sink) = h.finish().await?;
    assert_eq!(stocks.len(), 4);

    let rows = sink.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].stock.as_str(), rows[0].timestamp), ("AAPL", t(1)));
    assert_eq!((rows[1].stock.as_str(), rows[1].timestamp), ("AAPL", t(2)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn drain_while_streaming_stops_first() -> anyhow::Result<()> {
    let h = harness(
        vec![Step::now(vec![quote("A", 0)]), Step::after(80, vec![quote("B", 0)])],
        PollerConfig::default(),
    );

    h.poller.start()?;
    sleep(ms(250)).await;

    tokio::time::timeout(ms(1_000), h.poller.drain()).await?;

    assert_eq!(h.poller.state(), PollerState::Stopped);
    assert_eq!(h.poller.in_flight(), 0);
    assert_eq!(h.poller.stats().requests_issued, 2);

    let (stocks, _) = h.finish().await?;
    assert_eq!(stocks, ["A", "B"]);

    Ok(())
}
