//! Charts of the price history and its forecast.
//!
//! `ChartData` turns dated series into `(x, price)` pairs, with `x` counted in
//! days from the first observation. The ASCII, SVG and TUI renderers all draw
//! from it, so they agree on bounds and on which series is which.

use chrono::{Duration, NaiveDate};

use crate::domain::{ForecastSeries, PriceSeries};

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;

/// Relative padding added above and below the price range.
pub const Y_PAD_FRAC: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Date at `x = 0`.
    pub origin: NaiveDate,
    pub actual: Vec<(f64, f64)>,
    pub forecast: Vec<(f64, f64)>,
}

impl ChartData {
    /// `None` when there is nothing to draw.
    pub fn new(series: &PriceSeries, forecast: Option<&ForecastSeries>) -> Option<Self> {
        let forecast_points = forecast.map(|f| f.points.as_slice()).unwrap_or_default();
        let origin = series
            .first()
            .map(|p| p.date)
            .or_else(|| forecast_points.first().map(|p| p.date))?;

        let x_of = |date: NaiveDate| (date - origin).num_days() as f64;
        Some(Self {
            origin,
            actual: series.points().iter().map(|p| (x_of(p.date), p.price)).collect(),
            forecast: forecast_points.iter().map(|p| (x_of(p.date), p.prediction)).collect(),
        })
    }

    fn all_points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.actual.iter().chain(self.forecast.iter())
    }

    /// `[min, max]` day offsets; widened by a day each side for a single date.
    pub fn x_bounds(&self) -> [f64; 2] {
        let (lo, hi) = min_max(self.all_points().map(|p| p.0)).unwrap_or((0.0, 1.0));
        if hi > lo { [lo, hi] } else { [lo - 1.0, hi + 1.0] }
    }

    /// `[min, max]` prices, padded by `Y_PAD_FRAC` of the span.
    pub fn y_bounds(&self) -> [f64; 2] {
        let (lo, hi) = min_max(self.all_points().map(|p| p.1)).unwrap_or((0.0, 1.0));
        let span = hi - lo;
        let pad = if span > 0.0 { span * Y_PAD_FRAC } else { lo.abs().max(1.0) * Y_PAD_FRAC };
        [lo - pad, hi + pad]
    }

    /// Calendar date of a (possibly fractional) day offset.
    pub fn date_at(&self, x: f64) -> NaiveDate {
        self.origin
            .checked_add_signed(Duration::days(x.round() as i64))
            .unwrap_or(self.origin)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
