//! Time-series model implementations.
//!
//! The search code in `fit` only needs `ArimaModel::fit`, `forecast` and the
//! information criteria, so other model families could slot in next to it.

pub mod arima;

pub use arima::*;
