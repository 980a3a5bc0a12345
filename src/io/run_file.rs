//! Read/write saved runs (JSON).
//!
//! A run file holds the price history, the forecast, the evaluation and the
//! chosen model, so `pf plot` can re-render charts without refetching or
//! refitting. The schema is defined by `domain::ForecastFile`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::{ForecastFile, PriceSeries};
use crate::error::{AppError, EXIT_INPUT};

pub fn write_run_json(path: &Path, run: &ForecastFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create run JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, run)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write run JSON: {e}")))?;
    Ok(())
}

/// Read a run file. The price series is re-normalized (sorted, deduplicated)
/// since the file may have been edited by hand.
pub fn read_run_json(path: &Path) -> Result<ForecastFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open run JSON '{}': {e}", path.display())))?;
    let mut run: ForecastFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid run JSON: {e}")))?;
    run.series = PriceSeries::from_points(run.series.points().iter().copied());
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArimaOrder, Evaluation, ForecastPoint, ForecastSeries, ModelSummary, PricePoint};
    use chrono::NaiveDate;

    fn sample_run() -> ForecastFile {
        let d = |day: u32| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        ForecastFile {
            tool: "price-forecast 0.1.0".to_string(),
            ticker: "MSFT".to_string(),
            generated: "2024-01-04T00:00:00Z".to_string(),
            date_range: None,
            horizon: 1,
            test_percentage: 20,
            evaluation: Evaluation::Skipped {
                reason: "too short".to_string(),
            },
            model: ModelSummary {
                order: ArimaOrder::new(0, 1, 0),
                with_intercept: true,
                intercept: 1.0,
                ar: vec![],
                ma: vec![],
                sigma2: 0.5,
                log_likelihood: -1.0,
                aic: 6.0,
                aicc: 18.0,
                bic: 4.75,
                n_obs: 2,
            },
            series: PriceSeries::from_points((1..=3).map(|day| PricePoint {
                date: d(day),
                price: day as f64,
            })),
            forecast: ForecastSeries {
                points: vec![ForecastPoint { date: d(4), prediction: 4.0 }],
            },
        }
    }

    #[test]
    fn run_file_survives_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let run = sample_run();
        write_run_json(&path, &run).unwrap();

        let back = read_run_json(&path).unwrap();
        assert_eq!(back.ticker, "MSFT");
        assert_eq!(back.series, run.series);
        assert_eq!(back.forecast, run.forecast);
        assert_eq!(back.evaluation, run.evaluation);
        assert_eq!(back.model, run.model);
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_run_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.message().starts_with("Invalid run JSON"));
    }
}
