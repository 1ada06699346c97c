use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use market::feed::client::DEFAULT_FEED_URL;
use pipeline::worker::DEFAULT_QUEUE_CAPACITY;
use scheduler::OrderingPolicy;
use scheduler::types::DEFAULT_POLL_INTERVAL;

#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Quote server endpoint; one GET per tick.
    pub feed_url: String,

    // =========================
    // Poller
    // =========================
    /// Fixed delay between ticks.
    pub poll_interval: Duration,

    /// Whether ticks may overlap outstanding requests.
    pub ordering: OrderingPolicy,

    /// Per-request limit. `None` lets a request wait forever.
    pub request_timeout: Option<Duration>,

    // =========================
    // Pipeline
    // =========================
    /// Capacity of the channel between fetch tasks and the pipeline worker.
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight requests before giving up on
    /// them.
    pub drain_timeout: Duration,

    /// Emit JSON log lines.
    pub json_logs: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            ordering: OrderingPolicy::Overlapping,
            request_timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: Duration::from_secs(5),
            json_logs: false,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("invalid value for {key}"))
}

impl StreamConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(url) = lookup("QUOTE_FEED_URL") {
            cfg.feed_url = url;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "POLL_INTERVAL_MS")? {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "REQUEST_TIMEOUT_MS")? {
            cfg.request_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(n) = parse_var::<usize>(&lookup, "PIPELINE_QUEUE_CAPACITY")? {
            cfg.queue_capacity = n;
        }
        if let Some(policy) = parse_var::<OrderingPolicy>(&lookup, "ORDERING_POLICY")? {
            cfg.ordering = policy;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "DRAIN_TIMEOUT_MS")? {
            cfg.drain_timeout = Duration::from_millis(ms);
        }
        cfg.json_logs = lookup("APP_ENV").is_some_and(|v| v == "production");

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.poll_interval.is_zero(), "poll interval must be positive");
        anyhow::ensure!(self.queue_capacity > 0, "queue capacity must be positive");
        anyhow::ensure!(!self.feed_url.is_empty(), "feed url must not be empty");
        Ok(())
    }
}
