//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the price series and its train/test partition (`PriceSeries`, `TrainTestSplit`)
//! - order search configuration (`SearchConfig`, `SearchStrategy`, `InformationCriterion`)
//! - request/response building blocks (`ForecastRequest`, `Evaluation`, `ForecastSeries`)
//! - the saved-run schema (`ForecastFile`)

pub mod types;

pub use types::*;
