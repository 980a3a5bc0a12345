//! Synthetic daily prices (`--demo`).
//!
//! A seeded geometric random walk with occasional jumps, one value per
//! weekday. The path depends only on the seed, the ticker and the dates, so
//! demos and tests are reproducible without network access.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::source::{PriceQuery, PriceSource};
use crate::domain::{PricePoint, PriceSeries};
use crate::error::DataError;

/// Walk parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start_price: f64,
    /// Daily log drift.
    pub drift: f64,
    /// Daily log volatility.
    pub volatility: f64,
    pub jump_prob: f64,
    /// Jump size in multiples of `volatility`.
    pub jump_k: f64,
    /// Trading days generated when the query has no range.
    pub history_days: usize,
    /// Last day (inclusive) of the generated history when the query has no range.
    pub as_of: NaiveDate,
}

impl SyntheticConfig {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            seed: 42,
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.015,
            jump_prob: 0.01,
            jump_k: 3.0,
            history_days: 750,
            as_of,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SyntheticConfig,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self, DataError> {
        let c = &config;
        if !(c.start_price.is_finite() && c.start_price > 0.0) {
            return Err(DataError::Io("Synthetic start price must be positive.".to_string()));
        }
        if !(c.volatility.is_finite() && c.volatility >= 0.0 && c.drift.is_finite()) {
            return Err(DataError::Io("Invalid synthetic drift/volatility.".to_string()));
        }
        if !(0.0..1.0).contains(&c.jump_prob) || !c.jump_k.is_finite() {
            return Err(DataError::Io("Invalid synthetic jump settings.".to_string()));
        }
        Ok(Self { config })
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic demo data"
    }

    fn fetch(&self, query: &PriceQuery) -> Result<PriceSeries, DataError> {
        let dates = match query.range {
            Some(range) => weekdays_between(range.start, range.end),
            None => trailing_weekdays(self.config.as_of, self.config.history_days),
        };
        let c = &self.config;

        let mut rng = StdRng::seed_from_u64(walk_seed(c.seed, &query.ticker));
        let normal = Normal::new(0.0, 1.0).map_err(|e| DataError::Io(format!("Noise distribution error: {e}")))?;

        let mut log_price = c.start_price.ln();
        let mut points = Vec::with_capacity(dates.len());
        for date in dates {
            let z: f64 = normal.sample(&mut rng);
            let jump = if rng.gen_bool(c.jump_prob) {
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                sign * c.jump_k * c.volatility
            } else {
                0.0
            };
            log_price += c.drift - 0.5 * c.volatility * c.volatility + c.volatility * z + jump;
            points.push(PricePoint {
                date,
                price: log_price.exp(),
            });
        }
        Ok(PriceSeries::from_points(points))
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a over the seed (little endian) and the ticker bytes.
fn walk_seed(seed: u64, ticker: &str) -> u64 {
    seed.to_le_bytes()
        .into_iter()
        .chain(ticker.bytes())
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays in `[start, end)`.
fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d < end).filter(|d| is_weekday(*d)).collect()
}

/// The last `n` weekdays up to and including `as_of`, ascending.
fn trailing_weekdays(as_of: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut day = as_of;
    while out.len() < n {
        if is_weekday(day) {
            out.push(day);
        }
        match day.checked_sub_signed(Duration::days(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    out.reverse();
    out
}
