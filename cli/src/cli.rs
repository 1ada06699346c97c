use std::time::Duration;

use clap::{Parser, ValueEnum};

use scheduler::OrderingPolicy;

use crate::config::StreamConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderingCli {
    Overlapping,
    Serialized,
}

#[derive(Debug, Parser)]
#[clap(name = "quote-stream", version)]
pub struct Cli {
    /// Quote server endpoint (overrides QUOTE_FEED_URL)
    #[clap(long)]
    pub url: Option<String>,

    /// Milliseconds between polls (overrides POLL_INTERVAL_MS)
    #[clap(long)]
    pub interval_ms: Option<u64>,

    /// Whether a tick may fire while a request is outstanding
    #[clap(long, value_enum)]
    pub ordering: Option<OrderingCli>,

    /// Abandon requests slower than this; 0 disables the limit
    #[clap(long)]
    pub request_timeout_ms: Option<u64>,

    /// Batch queue capacity between fetches and the pipeline
    #[clap(long)]
    pub queue_capacity: Option<usize>,

    /// How long shutdown waits for in-flight requests
    #[clap(long)]
    pub drain_timeout_ms: Option<u64>,

    /// Stop on its own after this long instead of waiting for ctrl-c
    #[clap(long)]
    pub run_for_ms: Option<u64>,

    /// Emit JSON log lines
    #[clap(long)]
    pub json_logs: bool,
}

pub(crate) fn cli_to_ordering(o: OrderingCli) -> OrderingPolicy {
    match o {
        OrderingCli::Overlapping => OrderingPolicy::Overlapping,
        OrderingCli::Serialized => OrderingPolicy::Serialized,
    }
}

impl Cli {
    /// Layer the flags that were given on top of `cfg`.
    pub fn apply(&self, mut cfg: StreamConfig) -> anyhow::Result<StreamConfig> {
        if let Some(url) = &self.url {
            cfg.feed_url = url.clone();
        }
        if let Some(ms) = self.interval_ms {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        if let Some(o) = self.ordering {
            cfg.ordering = cli_to_ordering(o);
        }
        if let Some(ms) = self.request_timeout_ms {
            cfg.request_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(n) = self.queue_capacity {
            cfg.queue_capacity = n;
        }
        if let Some(ms) = self.drain_timeout_ms {
            cfg.drain_timeout = Duration::from_millis(ms);
        }
        cfg.json_logs |= self.json_logs;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }
}
