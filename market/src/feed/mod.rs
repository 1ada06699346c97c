//! Quote data sources.

pub mod client;
pub mod errors;
pub mod wire;

use async_trait::async_trait;

use crate::types::QuoteObservation;

pub use client::HttpQuoteFeed;
pub use errors::SourceError;

/// Provider of timestamped quote batches.
///
/// A call resolves at most once, with a possibly empty batch. A source that
/// has run dry may also never resolve at all; callers must not depend on
/// completion.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    async fn get_data(&self) -> Result<Vec<QuoteObservation>, SourceError>;
}
