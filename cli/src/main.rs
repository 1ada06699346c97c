use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use common::logger::{LogFormat, init_logger};
use market::feed::HttpQuoteFeed;
use quote_stream::cli::Cli;
use quote_stream::config::StreamConfig;
use quote_stream::controller::StreamController;
use quote_stream::table_sink::TableSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.apply(StreamConfig::from_env()?)?;

    let format = if cfg.json_logs {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_logger("quote-stream", format);

    info!(
        interval_ms = cfg.poll_interval.as_millis() as u64,
        ordering = %cfg.ordering,
        "starting quote stream"
    );

    let source = Arc::new(
        HttpQuoteFeed::new(cfg.feed_url.clone()).context("failed to build quote feed client")?,
    );
    info!(url = source.url(), "quote feed ready");
    let sink = Arc::new(TableSink::new());
    let controller = StreamController::new(source, sink, &cfg);

    controller.start()?;

    match cli.run_for() {
        Some(limit) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("ctrl-c received"),
                _ = tokio::time::sleep(limit) => info!("run time elapsed"),
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            info!("ctrl-c received");
        }
    }

    let rows = controller.log().len().await;
    let summary = controller.shutdown(cfg.drain_timeout).await?;

    info!(
        log_rows_at_stop = rows,
        ticks = summary.poller.ticks,
        skipped = summary.poller.skipped_ticks,
        source_errors = summary.poller.source_errors,
        timeouts = summary.poller.timeouts,
        records = summary.pipeline.records_appended,
        rendered_rows = summary.pipeline.rows_published,
        drained = summary.drained,
        "quote stream finished"
    );

    Ok(())
}
