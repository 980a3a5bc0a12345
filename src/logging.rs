//! Tracing subscriber setup.
//!
//! The filter comes from `PF_LOG` when set (any `EnvFilter` directive),
//! otherwise from the `-v` count. The CLI logs to stderr; the TUI owns the
//! terminal, so it logs to a file or not at all.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{AppError, EXIT_INPUT};

pub const LOG_ENV: &str = "PF_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Off,
}

/// `warn` by default; each `-v` raises the level one step.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8, target: LogTarget) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let (stderr_layer, file_layer) = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => (Some(fmt::layer().with_target(false).with_writer(std::io::stderr)), None),
        LogTarget::File(path) => {
            let file = File::create(&path)
                .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create log file '{}': {e}", path.display())))?;
            (None, Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();
    Ok(())
}
