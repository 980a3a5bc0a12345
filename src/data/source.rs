//! The data source seam.

use crate::domain::{DateRange, PriceSeries};
use crate::error::DataError;

/// What to fetch: one ticker, optionally restricted to `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    /// Normalized (uppercase) symbol.
    pub ticker: String,
    /// `None` means the full available history up to today.
    pub range: Option<DateRange>,
}

/// Anything that can produce a daily adjusted-close series.
///
/// An unknown ticker or an empty range is not an error: implementations return
/// an empty series and let the caller decide what "no data" means.
pub trait PriceSource {
    /// Human-readable source name for messages and logs.
    fn name(&self) -> &str;

    fn fetch(&self, query: &PriceQuery) -> Result<PriceSeries, DataError>;
}

/// Keep only the observations inside the query range.
pub fn restrict_to_range(series: PriceSeries, range: Option<DateRange>) -> PriceSeries {
    match range {
        Some(range) => PriceSeries::from_points(series.points().iter().copied().filter(|p| range.contains(p.date))),
        None => series,
    }
}
