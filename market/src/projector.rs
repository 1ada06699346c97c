//! Projection of raw quotes into the visualization schema.

use crate::types::{PriceLevel, QuoteObservation, VisualizationRow};

/// Price used for a missing side of the book. The sink schema requires a
/// numeric column, so absence is never represented as null.
pub const MISSING_PRICE: f64 = 0.0;

fn price_or_default(level: Option<&PriceLevel>) -> f64 {
    level.map_or(MISSING_PRICE, |l| l.price)
}

/// Map one observation to its visualization row.
pub fn project(obs: &QuoteObservation) -> VisualizationRow {
    VisualizationRow {
        stock: obs.stock.to_string(),
        top_ask_price: price_or_default(obs.top_ask.as_ref()),
        top_bid_price: price_or_default(obs.top_bid.as_ref()),
        timestamp: obs.timestamp,
    }
}

/// Project a sequence, preserving order.
pub fn project_all<'a, I>(observations: I) -> Vec<VisualizationRow>
where
    I: IntoIterator<Item = &'a QuoteObservation>,
{
    observations.into_iter().map(project).collect()
}
