//! Mathematical utilities: least squares, simplex minimization and time-series statistics.

pub mod ols;
pub mod optim;
pub mod stats;

pub use ols::*;
pub use optim::*;
pub use stats::*;
