//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during a pipeline run
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_HORIZON: usize = 1;
pub const MAX_HORIZON: usize = 30;
pub const DEFAULT_HORIZON: usize = 1;

pub const MIN_TEST_PERCENTAGE: u32 = 1;
pub const MAX_TEST_PERCENTAGE: u32 = 100;
pub const DEFAULT_TEST_PERCENTAGE: u32 = 20;

/// One daily adjusted-close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily adjusted-close series.
///
/// Invariants (enforced by `from_points`):
/// - ascending by date
/// - no duplicate dates
/// - all prices finite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a series from unordered raw observations.
    ///
    /// Non-finite prices are dropped; for duplicate dates the last observation wins.
    pub fn from_points(raw: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut points: Vec<PricePoint> = raw.into_iter().filter(|p| p.price.is_finite()).collect();
        // Stable sort keeps input order within a date, so "last wins" below is well defined.
        points.sort_by_key(|p| p.date);

        let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match out.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => out.push(p),
            }
        }
        Self { points: out }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Min/max price, or `None` for an empty series.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let mut lo = first.price;
        let mut hi = first.price;
        for p in &self.points {
            lo = lo.min(p.price);
            hi = hi.max(p.price);
        }
        Some((lo, hi))
    }
}

/// A custom `[start, end)` date range. The end date is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a validated range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedRange { start, end });
        }
        if end == start {
            return Err(ValidationError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Partition of a series into a contiguous train prefix and test suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train_len: usize,
    pub test_len: usize,
}

impl TrainTestSplit {
    /// `test_len = floor(test_percentage * len / 100)`, in exact integer arithmetic.
    pub fn new(len: usize, test_percentage: u32) -> Self {
        let pct = test_percentage.min(MAX_TEST_PERCENTAGE) as usize;
        let test_len = pct * len / 100;
        Self {
            train_len: len - test_len,
            test_len,
        }
    }

    pub fn train<'a, T>(&self, data: &'a [T]) -> &'a [T] {
        &data[..self.train_len]
    }

    pub fn test<'a, T>(&self, data: &'a [T]) -> &'a [T] {
        &data[self.train_len..self.train_len + self.test_len]
    }
}

/// Information criterion used to rank candidate orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    Aic,
    Aicc,
    Bic,
}

impl InformationCriterion {
    pub fn display_name(self) -> &'static str {
        match self {
            InformationCriterion::Aic => "AIC",
            InformationCriterion::Aicc => "AICc",
            InformationCriterion::Bic => "BIC",
        }
    }
}

/// How candidate orders are explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Greedy neighbour search from a few starting orders.
    Stepwise,
    /// Seeded random sample of the candidate grid.
    Random,
    /// Every candidate in the grid (capped by `max_fits`).
    Grid,
}

/// Non-seasonal ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = String;

    /// Parses `p,d,q` (e.g. `1,1,0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected p,d,q (got '{s}')"));
        }
        let parse = |v: &str| {
            v.parse::<usize>()
                .map_err(|e| format!("invalid order component '{v}': {e}"))
        };
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

/// Order search configuration.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub strategy: SearchStrategy,
    pub criterion: InformationCriterion,
    pub start_p: usize,
    pub start_q: usize,
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    /// Upper bound on candidate fits attempted per search.
    pub max_fits: usize,
    /// Seed for the random strategy.
    pub seed: u64,
    /// Significance level of the KPSS differencing test.
    pub alpha: f64,
    /// Nelder–Mead iteration budget per candidate.
    pub max_iter: usize,
    /// Skip the search and fit this order directly.
    pub fixed_order: Option<ArimaOrder>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Stepwise,
            criterion: InformationCriterion::Aic,
            start_p: 2,
            start_q: 2,
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_order: 5,
            max_fits: 100,
            seed: 42,
            alpha: 0.05,
            max_iter: 2000,
            fixed_order: None,
        }
    }
}

/// Portable description of a fitted ARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub order: ArimaOrder,
    pub with_intercept: bool,
    pub intercept: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    /// Observations used by the estimator (after differencing).
    pub n_obs: usize,
}

impl ModelSummary {
    pub fn criterion(&self, ic: InformationCriterion) -> f64 {
        match ic {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Aicc => self.aicc,
            InformationCriterion::Bic => self.bic,
        }
    }

    pub fn display_name(&self) -> String {
        if self.with_intercept {
            format!("{} with intercept", self.order)
        } else {
            self.order.to_string()
        }
    }
}

/// Outcome of the evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Evaluation {
    Scored {
        rmse: f64,
        train_len: usize,
        test_len: usize,
    },
    Skipped {
        reason: String,
    },
}

impl Evaluation {
    pub fn rmse(&self) -> Option<f64> {
        match self {
            Evaluation::Scored { rmse, .. } => Some(*rmse),
            Evaluation::Skipped { .. } => None,
        }
    }
}

/// One forecast value with its synthesized date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub prediction: f64,
}

/// Forecast values indexed by synthesized calendar dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Immutable description of one "get predictions" action.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    /// Ticker as typed; normalized (trimmed, uppercased) by the pipeline.
    pub ticker: String,
    /// Raw custom range; validated by the pipeline.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub horizon: usize,
    pub test_percentage: u32,
    /// The caller's notion of "today" (anchors forecast dates without a range).
    pub today: NaiveDate,
}

impl ForecastRequest {
    pub fn normalized_ticker(&self) -> String {
        self.ticker.trim().to_uppercase()
    }
}

/// Saved run: everything needed to re-render the charts later.
///
/// The schema is written by `io::run_file` and read back by `pf plot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastFile {
    pub tool: String,
    pub ticker: String,
    pub generated: String,
    pub date_range: Option<DateRange>,
    pub horizon: usize,
    pub test_percentage: u32,
    pub evaluation: Evaluation,
    pub model: ModelSummary,
    pub series: PriceSeries,
    pub forecast: ForecastSeries,
}
