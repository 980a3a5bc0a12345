//! Price data sources.
//!
//! - `yahoo`: the network adapter (Yahoo Finance chart API)
//! - `csv_source`: offline CSV exports
//! - `sample`: seeded synthetic prices for demos and tests

pub mod csv_source;
pub mod sample;
pub mod source;
pub mod yahoo;

pub use csv_source::CsvPriceSource;
pub use sample::{SyntheticConfig, SyntheticSource};
pub use source::{PriceQuery, PriceSource};
pub use yahoo::YahooClient;
