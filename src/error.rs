//! Error types.
//!
//! - `AppError` is the application-boundary error: a message plus the process
//!   exit code the binary should return.
//! - `ValidationError`, `DataError`, `FitError` and `PipelineError` are the
//!   domain errors produced by the pipeline. They convert into `AppError` when
//!   a front-end needs to stop.

use chrono::NaiveDate;
use thiserror::Error;

/// Exit code for usage, input and file errors.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when the data source returned nothing to work with.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for model fitting, terminal and other internal failures.
pub const EXIT_INTERNAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Request validation failures. These stop the pipeline before any network or
/// model call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Ticker symbol is empty.")]
    EmptyTicker,

    #[error("End date {end} is before start date {start}.")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Date range {start}..{end} is empty (the end date is exclusive).")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("Forecast horizon must be between 1 and 30 days (got {0}).")]
    HorizonOutOfRange(usize),

    #[error("Test percentage must be between 1 and 100 (got {0}).")]
    TestPercentageOutOfRange(u32),
}

/// Data source failures (an empty result is not an error).
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("Request to {source_name} failed: {message}")]
    Request { source_name: String, message: String },

    #[error("{source_name} returned HTTP {status}: {message}")]
    Status {
        source_name: String,
        status: u16,
        message: String,
    },

    #[error("Could not parse {source_name} response: {message}")]
    Parse { source_name: String, message: String },

    #[error("{0}")]
    Io(String),
}

/// Model selection and fitting failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Series contains non-finite values (first at index {index}).")]
    NonFinite { index: usize },

    #[error("Not enough observations to fit a model: need at least {needed}, got {got}.")]
    InsufficientData { needed: usize, got: usize },

    #[error("Degenerate series: {0}")]
    Degenerate(String),

    #[error("Order search did not produce a usable model: {0}")]
    NoConvergence(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors collected at the pipeline boundary and rendered by the front-ends.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("No price data available for {ticker}.")]
    NoData { ticker: String },

    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Validation(_) => EXIT_INPUT,
            PipelineError::Data(_) => EXIT_INPUT,
            PipelineError::NoData { .. } => EXIT_NO_DATA,
            PipelineError::Fit(_) => EXIT_INTERNAL,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(EXIT_INTERNAL, err.to_string())
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::new(EXIT_INPUT, err.to_string())
    }
}
