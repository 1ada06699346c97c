//! JSON shape served by the quote server.
//!
//! ```json
//! [{"id": "0.1099", "stock": "ABC", "timestamp": "2019-02-11 22:06:30.572453",
//!   "top_ask": {"price": 121.2, "size": 36}, "top_bid": {"price": 120.48, "size": 109}}]
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::feed::errors::SourceError;
use crate::types::{PriceLevel, QuoteObservation, Timestamp};

const SERVER_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One side of the book as served. A side without a price is treated as
/// absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerLevel {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
}

impl ServerLevel {
    fn into_level(self) -> Option<PriceLevel> {
        self.price
            .map(|price| PriceLevel::new(price, self.size.unwrap_or_default()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerQuote {
    #[serde(default)]
    pub id: Option<Value>,
    pub stock: String,
    pub timestamp: String,
    #[serde(default)]
    pub top_ask: Option<ServerLevel>,
    #[serde(default)]
    pub top_bid: Option<ServerLevel>,
}

/// Parse the server's naive `"YYYY-MM-DD HH:MM:SS.ffffff"` (read as UTC) or
/// an RFC 3339 string.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, SourceError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, SERVER_TS_FORMAT) {
        return Ok(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SourceError::InvalidTimestamp(raw.to_string()))
}

impl TryFrom<ServerQuote> for QuoteObservation {
    type Error = SourceError;

    fn try_from(q: ServerQuote) -> Result<Self, Self::Error> {
        if q.stock.is_empty() {
            return Err(SourceError::EmptyStock);
        }

        Ok(QuoteObservation {
            stock: q.stock.into(),
            top_ask: q.top_ask.and_then(ServerLevel::into_level),
            top_bid: q.top_bid.and_then(ServerLevel::into_level),
            timestamp: parse_timestamp(&q.timestamp)?,
        })
    }
}

/// Decode a response body into observations.
///
/// A body that is not a JSON array fails as a whole. Each element is then
/// decoded on its own: elements missing `stock` or `timestamp`, with an
/// empty stock or with an unreadable timestamp are skipped, and the rest of
/// the batch is kept.
pub fn decode_batch(body: &[u8]) -> Result<Vec<QuoteObservation>, SourceError> {
    let raw: Vec<Value> = serde_json::from_slice(body)?;

    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        let q = match serde_json::from_value::<ServerQuote>(value) {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "dropping undecodable quote");
                continue;
            }
        };
        let id = q.id.clone();
        match QuoteObservation::try_from(q) {
            Ok(obs) => out.push(obs),
            Err(e) => warn!(error = %e, quote_id = ?id, "dropping malformed quote"),
        }
    }

    Ok(out)
}
