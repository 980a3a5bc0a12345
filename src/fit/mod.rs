//! Model selection and forecasting.
//!
//! Responsibilities:
//!
//! - choose the differencing order and search ARIMA candidates (`search`)
//! - expose selection behind the `ModelSelector` seam (`selector`)
//! - run the hold-out evaluation, refit and forecast (`engine`)

pub mod engine;
pub mod search;
pub mod selector;

pub use engine::*;
pub use search::*;
pub use selector::*;
