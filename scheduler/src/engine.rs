//! Fixed-interval poller.
//!
//! While streaming, a ticker task fires every `interval`. Each tick spawns
//! one request to the data source; the resulting batch is forwarded to the
//! pipeline worker, which owns the event log.
//!
//!   tick → DataSource::get_data → BatchSender → pipeline worker
//!
//! Ticks do not wait for earlier requests. Whether a tick may issue a new
//! request while another is outstanding is decided by [`OrderingPolicy`].
//! `stop` only cancels the ticker: requests already issued run to
//! completion and their batches are still appended.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, warn};

use common::logger::{TraceId, tick_span, warn_if_slow};
use market::feed::DataSource;
use pipeline::BatchSender;

use crate::error::SchedulerError;
use crate::policy::{InFlight, InFlightGuard};
use crate::state::PollerState;
use crate::types::{PollerConfig, PollerStats, PollerStatsSnapshot};

/// Everything a ticker or request task needs.
struct TickContext<S> {
    source: Arc<S>,
    batches: BatchSender,
    cfg: PollerConfig,
    stats: PollerStats,
    in_flight: InFlight,
    tracker: TaskTracker,
}

struct Lifecycle {
    state: PollerState,
    cancel: Option<CancellationToken>,
}

pub struct Poller<S: DataSource> {
    ctx: Arc<TickContext<S>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<S: DataSource> Poller<S> {
    pub fn new(source: Arc<S>, batches: BatchSender, cfg: PollerConfig) -> Self {
        Self {
            ctx: Arc::new(TickContext {
                source,
                batches,
                cfg,
                stats: PollerStats::default(),
                in_flight: InFlight::default(),
                tracker: TaskTracker::new(),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: PollerState::Idle,
                cancel: None,
            }),
        }
    }

    pub fn state(&self) -> PollerState {
        self.lifecycle.lock().state
    }

    pub fn config(&self) -> &PollerConfig {
        &self.ctx.cfg
    }

    pub fn stats(&self) -> PollerStatsSnapshot {
        self.ctx.stats.snapshot()
    }

    /// Requests issued and not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.ctx.in_flight.current()
    }

    /// Arm the timer. Must be called from within a tokio runtime.
    ///
    /// Allowed from `Idle` and `Stopped`; restarting never clears data
    /// already forwarded.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut lc = self.lifecycle.lock();

        if !lc.state.can_start() {
            return Err(SchedulerError::AlreadyStreaming);
        }
        if self.ctx.batches.is_closed() {
            return Err(SchedulerError::PipelineClosed);
        }

        let cancel = CancellationToken::new();
        self.ctx.tracker.spawn(
            run_ticker(Arc::clone(&self.ctx), cancel.clone())
                .instrument(tracing::info_span!("poller")),
        );

        info!(from = %lc.state, "poller streaming");
        lc.state = PollerState::Streaming;
        lc.cancel = Some(cancel);

        Ok(())
    }

    /// Cancel the timer. Returns `false` if the poller was not streaming.
    pub fn stop(&self) -> bool {
        let mut lc = self.lifecycle.lock();

        if !lc.state.can_stop() {
            debug!(state = %lc.state, "stop ignored");
            return false;
        }

        if let Some(cancel) = lc.cancel.take() {
            cancel.cancel();
        }
        lc.state = PollerState::Stopped;

        info!(in_flight = self.in_flight(), "poller stopped");
        true
    }

    /// Stop the timer if it is still running, then wait for the ticker and
    /// every issued request to finish.
    ///
    /// Returns once the source has answered (or timed out) every
    /// outstanding request.
    pub async fn drain(&self) {
        self.stop();
        self.ctx.tracker.close();
        self.ctx.tracker.wait().await;
        self.ctx.tracker.reopen();
    }
}

impl<S: DataSource> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(cancel) = self.lifecycle.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}

async fn run_ticker<S: DataSource>(ctx: Arc<TickContext<S>>, cancel: CancellationToken) {
    let period = ctx.cfg.interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        every_ms = period.as_millis() as u64,
        ordering = %ctx.cfg.ordering,
        "poller timer armed"
    );

    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        seq += 1;
        PollerStats::bump(&ctx.stats.ticks);

        let Some((slot, now_in_flight)) = ctx.in_flight.try_acquire(ctx.cfg.ordering) else {
            PollerStats::bump(&ctx.stats.skipped_ticks);
            debug!(seq, "request still in flight; tick skipped");
            continue;
        };

        PollerStats::bump(&ctx.stats.requests_issued);
        ctx.stats
            .peak_in_flight
            .fetch_max(now_in_flight as u64, Ordering::Relaxed);

        let span = tick_span(seq, &TraceId::new());
        ctx.tracker
            .spawn(fetch_batch(Arc::clone(&ctx), slot).instrument(span));
    }

    info!(ticks = seq, "poller timer cancelled");
}

/// One request: fetch, then hand the batch to the pipeline. Failures are
/// logged and counted; the next tick tries again.
async fn fetch_batch<S: DataSource>(ctx: Arc<TickContext<S>>, _slot: InFlightGuard) {
    let request = warn_if_slow("get_data", ctx.cfg.slow_request, ctx.source.get_data());

    let result = match ctx.cfg.request_timeout {
        Some(limit) => match timeout(limit, request).await {
            Ok(r) => r,
            Err(_) => {
                PollerStats::bump(&ctx.stats.timeouts);
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "quote request timed out"
                );
                return;
            }
        },
        None => request.await,
    };

    let batch = match result {
        Ok(batch) => batch,
        Err(e) => {
            PollerStats::bump(&ctx.stats.source_errors);
            warn!(error = %e, "quote request failed");
            return;
        }
    };

    let records = batch.len();
    if records == 0 {
        PollerStats::bump(&ctx.stats.empty_batches);
    }

    if ctx.batches.send(batch).await.is_err() {
        PollerStats::bump(&ctx.stats.undelivered);
        warn!(records, "pipeline closed; batch dropped");
        return;
    }

    PollerStats::bump(&ctx.stats.batches_forwarded);
    ctx.stats
        .records_forwarded
        .fetch_add(records as u64, Ordering::Relaxed);

    debug!(records, "batch forwarded");
}
