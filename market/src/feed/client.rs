use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::feed::errors::SourceError;
use crate::feed::{DataSource, wire};
use crate::types::QuoteObservation;

pub const DEFAULT_FEED_URL: &str = "http://localhost:8080/query?id=1";

/// HTTP client for the quote server. Each `get_data` is one GET returning a
/// JSON array of quotes.
#[derive(Clone)]
pub struct HttpQuoteFeed {
    http: Client,
    url: String,
}

impl HttpQuoteFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DataSource for HttpQuoteFeed {
    #[instrument(skip(self), fields(url = %self.url), level = "debug")]
    async fn get_data(&self) -> Result<Vec<QuoteObservation>, SourceError> {
        let resp = self.http.get(&self.url).send().await?.error_for_status()?;
        let body = resp.bytes().await?;

        let batch = wire::decode_batch(&body)?;

        debug!(records = batch.len(), "quote batch fetched");

        Ok(batch)
    }
}
