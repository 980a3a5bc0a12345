//! Export the forecast to CSV (`date,prediction`).
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use crate::domain::ForecastSeries;
use crate::error::{AppError, EXIT_INPUT};

pub fn write_forecast_csv(path: &Path, forecast: &ForecastSeries) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create forecast CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["date", "prediction"])
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write forecast CSV header: {e}")))?;
    for p in &forecast.points {
        writer
            .write_record([p.date.to_string(), format!("{:.6}", p.prediction)])
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write forecast CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush forecast CSV: {e}")))?;
    Ok(())
}
