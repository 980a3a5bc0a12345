//! `price-forecast` library crate.
//!
//! The binary (`pf`) is a thin wrapper around this library so that:
//!
//! - the data, model and pipeline code is testable without a terminal or network
//! - CLI and TUI front-ends share one forecast pipeline

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
