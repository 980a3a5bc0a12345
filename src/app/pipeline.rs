//! Shared forecast pipeline used by both CLI and TUI front-ends.
//!
//! ```text
//! ForecastRequest -> validate -> fetch prices -> evaluate + forecast -> date the forecast
//! ```
//!
//! The pipeline is a pure function of the request, the data source and the
//! model selector. Front-ends only render the `ForecastResponse`.

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::data::{PriceQuery, PriceSource};
use crate::domain::{
    DateRange, Evaluation, ForecastFile, ForecastPoint, ForecastRequest, ForecastSeries, PriceSeries, MAX_HORIZON,
    MAX_TEST_PERCENTAGE, MIN_HORIZON, MIN_TEST_PERCENTAGE,
};
use crate::error::{PipelineError, ValidationError};
use crate::fit::{evaluate_and_forecast, FittedModel, ModelSelector};

/// All computed outputs of a single "get predictions" action.
///
/// A failed stage leaves every later field empty, so a response never mixes
/// a new series with an old forecast.
#[derive(Debug, Clone)]
pub struct ForecastResponse {
    pub ticker: String,
    pub date_range: Option<DateRange>,
    /// The request had no ticker; nothing was fetched.
    pub skipped: bool,
    pub series: PriceSeries,
    pub evaluation: Option<Evaluation>,
    pub forecast: Option<ForecastSeries>,
    /// Model fitted on the training window.
    pub evaluation_model: Option<FittedModel>,
    /// Model fitted on the full series (produced the forecast).
    pub model: Option<FittedModel>,
    pub errors: Vec<PipelineError>,
}

impl ForecastResponse {
    fn new(ticker: String, date_range: Option<DateRange>) -> Self {
        Self {
            ticker,
            date_range,
            skipped: false,
            series: PriceSeries::empty(),
            evaluation: None,
            forecast: None,
            evaluation_model: None,
            model: None,
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.skipped && self.errors.is_empty()
    }

    /// Package a successful run for `io::run_file`.
    pub fn to_forecast_file(&self, request: &ForecastRequest, generated: String) -> Option<ForecastFile> {
        Some(ForecastFile {
            tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            ticker: self.ticker.clone(),
            generated,
            date_range: self.date_range,
            horizon: request.horizon,
            test_percentage: request.test_percentage,
            evaluation: self.evaluation.clone()?,
            model: self.model.as_ref()?.summary(),
            series: self.series.clone(),
            forecast: self.forecast.clone()?,
        })
    }
}

/// Validate the non-ticker parts of a request.
pub fn validate_request(request: &ForecastRequest) -> Result<Option<DateRange>, ValidationError> {
    if !(MIN_HORIZON..=MAX_HORIZON).contains(&request.horizon) {
        return Err(ValidationError::HorizonOutOfRange(request.horizon));
    }
    if !(MIN_TEST_PERCENTAGE..=MAX_TEST_PERCENTAGE).contains(&request.test_percentage) {
        return Err(ValidationError::TestPercentageOutOfRange(request.test_percentage));
    }
    request
        .date_range
        .map(|(start, end)| DateRange::new(start, end))
        .transpose()
}

/// Run one forecast request end to end.
///
/// Validation errors are returned before any fetch. Data and model errors are
/// collected in `ForecastResponse::errors`.
pub fn run_forecast(
    request: &ForecastRequest,
    source: &dyn PriceSource,
    selector: &dyn ModelSelector,
) -> Result<ForecastResponse, ValidationError> {
    let ticker = request.normalized_ticker();
    if ticker.is_empty() {
        let mut response = ForecastResponse::new(ticker, None);
        response.skipped = true;
        return Ok(response);
    }

    let range = validate_request(request)?;
    let mut response = ForecastResponse::new(ticker.clone(), range);

    info!(ticker = %ticker, source = source.name(), "fetching prices");
    let query = PriceQuery { ticker, range };
    let series = match source.fetch(&query) {
        Ok(series) => series,
        Err(e) => {
            warn!(error = %e, "price fetch failed");
            response.errors.push(e.into());
            return Ok(response);
        }
    };
    if series.is_empty() {
        response.errors.push(PipelineError::NoData {
            ticker: response.ticker.clone(),
        });
        return Ok(response);
    }
    response.series = series;

    info!(
        observations = response.series.len(),
        selector = %selector.describe(),
        horizon = request.horizon,
        test_percentage = request.test_percentage,
        "running forecast"
    );
    let values = response.series.values();
    match evaluate_and_forecast(&values, request.test_percentage, request.horizon, selector) {
        Ok(result) => {
            let anchor = forecast_anchor(range, request.today);
            let dates = synthesize_forecast_dates(anchor, result.forecast.len());
            response.forecast = Some(ForecastSeries {
                points: dates
                    .into_iter()
                    .zip(result.forecast)
                    .map(|(date, prediction)| ForecastPoint { date, prediction })
                    .collect(),
            });
            response.evaluation = Some(result.evaluation);
            response.evaluation_model = result.evaluation_model;
            response.model = Some(result.model);
        }
        Err(e) => {
            warn!(error = %e, "forecast failed");
            response.errors.push(e.into());
        }
    }
    Ok(response)
}

/// The day before the first forecast date: the range end, or yesterday.
pub fn forecast_anchor(range: Option<DateRange>, today: NaiveDate) -> NaiveDate {
    match range {
        Some(range) => range.end,
        None => today.checked_sub_signed(Duration::days(1)).unwrap_or(today),
    }
}

/// `horizon` consecutive calendar days starting the day after `anchor`.
pub fn synthesize_forecast_dates(anchor: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    anchor.iter_days().skip(1).take(horizon).collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::domain::{PricePoint, DEFAULT_HORIZON, DEFAULT_TEST_PERCENTAGE};
    use crate::error::{DataError, FitError};
    use crate::fit::AutoArima;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// In-memory source that counts fetches.
    struct MemorySource {
        series: PriceSeries,
        calls: Cell<usize>,
    }

    impl MemorySource {
        fn new(values: &[f64]) -> Self {
            let start = d(2024, 1, 1);
            let series = PriceSeries::from_points(
                start
                    .iter_days()
                    .zip(values)
                    .map(|(date, &price)| PricePoint { date, price }),
            );
            Self {
                series,
                calls: Cell::new(0),
            }
        }
    }

    impl PriceSource for MemorySource {
        fn name(&self) -> &str {
            "memory"
        }

        fn fetch(&self, query: &PriceQuery) -> Result<PriceSeries, DataError> {
            self.calls.set(self.calls.get() + 1);
            Ok(crate::data::source::restrict_to_range(self.series.clone(), query.range))
        }
    }

    struct BrokenSource;

    impl PriceSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        fn fetch(&self, _query: &PriceQuery) -> Result<PriceSeries, DataError> {
            Err(DataError::Status {
                source_name: "broken".to_string(),
                status: 500,
                message: "server error".to_string(),
            })
        }
    }

    fn request(ticker: &str, horizon: usize, pct: u32) -> ForecastRequest {
        ForecastRequest {
            ticker: ticker.to_string(),
            date_range: None,
            horizon,
            test_percentage: pct,
            today: d(2024, 6, 15),
        }
    }

    fn trend(n: usize) -> Vec<f64> {
        (0..n).map(|t| 100.0 + 0.5 * t as f64).collect()
    }

    #[test]
    fn linear_trend_end_to_end() {
        let source = MemorySource::new(&trend(100));
        let response = run_forecast(&request("trend", 5, 20), &source, &AutoArima::default()).unwrap();

        assert!(response.is_ok(), "{:?}", response.errors);
        assert_eq!(response.ticker, "TREND");
        assert_eq!(response.series.len(), 100);

        let evaluation = response.evaluation.as_ref().unwrap();
        assert!(matches!(evaluation, Evaluation::Scored { test_len: 20, .. }));
        assert!(evaluation.rmse().unwrap() < 0.05 * 150.0);

        let forecast = response.forecast.as_ref().unwrap();
        assert_eq!(forecast.len(), 5);
        assert_eq!(forecast.points[0].date, d(2024, 6, 15));
        for (i, p) in forecast.points.iter().enumerate() {
            let expected = 100.0 + 0.5 * (100 + i) as f64;
            assert!((p.prediction - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn custom_range_anchors_dates_after_the_end() {
        let source = MemorySource::new(&trend(60));
        let mut req = request("trend", 3, 20);
        req.date_range = Some((d(2024, 1, 1), d(2024, 2, 1)));
        let response = run_forecast(&req, &source, &AutoArima::default()).unwrap();

        assert_eq!(response.series.len(), 31);
        let dates: Vec<NaiveDate> = response.forecast.unwrap().points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 2, 2), d(2024, 2, 3), d(2024, 2, 4)]);
    }

    #[test]
    fn single_point_reports_insufficient_data() {
        let source = MemorySource::new(&[42.0]);
        let response = run_forecast(&request("one", 1, 20), &source, &AutoArima::default()).unwrap();

        assert_eq!(response.series.len(), 1);
        assert!(response.forecast.is_none());
        assert!(response.evaluation.is_none());
        assert!(matches!(
            response.errors.as_slice(),
            [PipelineError::Fit(FitError::InsufficientData { got: 1, .. })]
        ));
    }

    #[test]
    fn no_data_is_reported_without_forecast() {
        let source = MemorySource::new(&[]);
        let response = run_forecast(&request("none", 1, 20), &source, &AutoArima::default()).unwrap();

        assert!(response.series.is_empty());
        assert!(response.forecast.is_none());
        assert!(matches!(response.errors.as_slice(), [PipelineError::NoData { ticker }] if ticker == "NONE"));
    }

    #[test]
    fn data_errors_are_collected() {
        let response = run_forecast(&request("x", 1, 20), &BrokenSource, &AutoArima::default()).unwrap();
        assert!(matches!(response.errors.as_slice(), [PipelineError::Data(_)]));
        assert!(response.series.is_empty());
    }

    #[test]
    fn invalid_requests_stop_before_fetching() {
        let source = MemorySource::new(&trend(10));

        let mut req = request("trend", 1, 20);
        req.date_range = Some((d(2024, 3, 1), d(2024, 2, 1)));
        assert!(matches!(
            run_forecast(&req, &source, &AutoArima::default()),
            Err(ValidationError::InvertedRange { .. })
        ));

        req.date_range = Some((d(2024, 3, 1), d(2024, 3, 1)));
        assert!(matches!(
            run_forecast(&req, &source, &AutoArima::default()),
            Err(ValidationError::EmptyRange { .. })
        ));

        assert_eq!(
            run_forecast(&request("trend", 0, 20), &source, &AutoArima::default()).unwrap_err(),
            ValidationError::HorizonOutOfRange(0)
        );
        assert_eq!(
            run_forecast(&request("trend", 1, 101), &source, &AutoArima::default()).unwrap_err(),
            ValidationError::TestPercentageOutOfRange(101)
        );
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn empty_ticker_is_skipped_silently() {
        let source = MemorySource::new(&trend(10));
        let response = run_forecast(
            &request("   ", DEFAULT_HORIZON, DEFAULT_TEST_PERCENTAGE),
            &source,
            &AutoArima::default(),
        )
        .unwrap();
        assert!(response.skipped);
        assert!(response.errors.is_empty());
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn runs_are_deterministic() {
        let values: Vec<f64> = (0..150)
            .map(|t| {
                let t = t as f64;
                80.0 + 0.05 * t + 2.0 * (0.4 * t).sin()
            })
            .collect();
        let source = MemorySource::new(&values);
        let a = run_forecast(&request("det", 10, 20), &source, &AutoArima::default()).unwrap();
        let b = run_forecast(&request("det", 10, 20), &source, &AutoArima::default()).unwrap();
        assert_eq!(a.forecast, b.forecast);
        assert_eq!(a.evaluation, b.evaluation);
    }

    #[test]
    fn forecast_dates_are_consecutive_days() {
        let anchor = d(2024, 2, 27);
        for horizon in MIN_HORIZON..=MAX_HORIZON {
            let dates = synthesize_forecast_dates(anchor, horizon);
            assert_eq!(dates.len(), horizon);
            assert_eq!(dates[0], d(2024, 2, 28));
            for pair in dates.windows(2) {
                assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
        }
        assert_eq!(forecast_anchor(None, d(2024, 3, 1)), d(2024, 2, 29));
    }

    #[test]
    fn successful_run_converts_to_forecast_file() {
        let source = MemorySource::new(&trend(40));
        let req = request("trend", 2, 20);
        let response = run_forecast(&req, &source, &AutoArima::default()).unwrap();
        let file = response.to_forecast_file(&req, "2024-06-15T00:00:00Z".to_string()).unwrap();
        assert_eq!(file.ticker, "TREND");
        assert_eq!(file.forecast.len(), 2);
        assert_eq!(file.series.len(), 40);
    }
}
