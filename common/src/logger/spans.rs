use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Span;

use super::TraceId;

/// Root span for one scheduler tick.
pub fn tick_span(seq: u64, trace_id: &TraceId) -> Span {
    tracing::info_span!("tick", seq, trace_id = %trace_id)
}

/// Await `fut` and emit a warning when it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
