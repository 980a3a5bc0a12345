//! Input/output helpers.
//!
//! - forecast CSV export (`export`)
//! - saved run JSON read/write (`run_file`)

pub mod export;
pub mod run_file;

pub use export::*;
pub use run_file::*;
