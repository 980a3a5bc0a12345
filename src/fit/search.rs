//! Automated ARIMA order search.
//!
//! 1. choose `d` with repeated KPSS tests (`math::ndiffs`)
//! 2. explore `(p, q, intercept)` candidates with the configured strategy
//! 3. keep the candidate with the lowest information criterion
//!
//! Every attempted candidate is recorded in a `SearchTrace`, whether it was
//! fitted or skipped, so front-ends can show what the search did.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::domain::{ArimaOrder, InformationCriterion, SearchConfig, SearchStrategy};
use crate::error::FitError;
use crate::math::{is_constant, ndiffs};
use crate::models::{ArimaFitOptions, ArimaModel, ArimaSpec};

/// Shortest series any search will attempt.
pub const MIN_SERIES_LEN: usize = 3;

/// Stepwise neighbourhood: `(Δp, Δq, toggle intercept)`.
const NEIGHBOURS: [(isize, isize, bool); 9] = [
    (-1, 0, false),
    (1, 0, false),
    (0, -1, false),
    (0, 1, false),
    (-1, -1, false),
    (1, 1, false),
    (-1, 1, false),
    (1, -1, false),
    (0, 0, true),
];

/// Result of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateStatus {
    /// Fitted; value of the search criterion.
    Fitted(f64),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub spec: ArimaSpec,
    pub status: CandidateStatus,
}

/// Everything the search attempted, in visiting order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTrace {
    pub strategy: Option<SearchStrategy>,
    pub criterion: InformationCriterion,
    pub d: usize,
    pub candidates: Vec<CandidateRecord>,
}

impl SearchTrace {
    pub fn fitted(&self) -> impl Iterator<Item = (&ArimaSpec, f64)> {
        self.candidates.iter().filter_map(|c| match c.status {
            CandidateStatus::Fitted(ic) => Some((&c.spec, ic)),
            CandidateStatus::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&ArimaSpec, &str)> {
        self.candidates.iter().filter_map(|c| match &c.status {
            CandidateStatus::Fitted(_) => None,
            CandidateStatus::Skipped(reason) => Some((&c.spec, reason.as_str())),
        })
    }
}

/// Check that a series can be handed to any estimator at all.
pub fn validate_series(y: &[f64]) -> Result<(), FitError> {
    if let Some(index) = y.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFinite { index });
    }
    if y.len() < MIN_SERIES_LEN {
        return Err(FitError::InsufficientData {
            needed: MIN_SERIES_LEN,
            got: y.len(),
        });
    }
    if is_constant(y) {
        return Err(FitError::Degenerate(format!(
            "all {} observations are equal; no order can be identified",
            y.len()
        )));
    }
    Ok(())
}

/// Run the order search on `y` and return the best model.
pub fn search_arima(y: &[f64], config: &SearchConfig) -> Result<(ArimaModel, SearchTrace), FitError> {
    validate_series(y)?;
    check_config(config)?;

    let mut d = ndiffs(y, config.alpha, config.max_d);
    while d > 0 && y.len() < d + MIN_SERIES_LEN {
        d -= 1;
    }
    debug!(d, n = y.len(), "selected differencing order");

    let mut search = Search::new(y, d, config);
    match config.strategy {
        SearchStrategy::Stepwise => search.stepwise(),
        SearchStrategy::Random => {
            let mut grid = search.grid();
            let mut rng = StdRng::seed_from_u64(config.seed);
            grid.shuffle(&mut rng);
            search.visit_all(&grid);
        }
        SearchStrategy::Grid => {
            let grid = search.grid();
            search.visit_all(&grid);
        }
    }
    search.finish(Some(config.strategy))
}

/// Fit a single spec, recording it as a one-candidate trace.
pub fn fit_fixed(y: &[f64], spec: ArimaSpec, config: &SearchConfig) -> Result<(ArimaModel, SearchTrace), FitError> {
    validate_series(y)?;
    let mut search = Search::new(y, spec.order.d, config);
    search.try_fit(spec);
    search.finish(None)
}

fn check_config(config: &SearchConfig) -> Result<(), FitError> {
    if config.max_fits == 0 {
        return Err(FitError::InvalidParameter("max_fits must be at least 1".to_string()));
    }
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(FitError::InvalidParameter(format!(
            "KPSS alpha must be in (0, 1) (got {})",
            config.alpha
        )));
    }
    Ok(())
}

struct Search<'a> {
    y: &'a [f64],
    d: usize,
    config: &'a SearchConfig,
    opts: ArimaFitOptions,
    visited: BTreeMap<ArimaSpec, Option<f64>>,
    trace: Vec<CandidateRecord>,
    errors: Vec<FitError>,
    best: Option<(ArimaModel, f64)>,
}

impl<'a> Search<'a> {
    fn new(y: &'a [f64], d: usize, config: &'a SearchConfig) -> Self {
        Self {
            y,
            d,
            config,
            opts: ArimaFitOptions {
                max_iter: config.max_iter,
            },
            visited: BTreeMap::new(),
            trace: Vec::new(),
            errors: Vec::new(),
            best: None,
        }
    }

    fn allow_intercept(&self) -> bool {
        self.d <= 1
    }

    fn spec(&self, p: usize, q: usize, with_intercept: bool) -> ArimaSpec {
        ArimaSpec::new(ArimaOrder::new(p, self.d, q), with_intercept)
    }

    fn in_bounds(&self, spec: &ArimaSpec) -> bool {
        let ArimaOrder { p, q, .. } = spec.order;
        p <= self.config.max_p
            && q <= self.config.max_q
            && p + q <= self.config.max_order
            && (!spec.with_intercept || self.allow_intercept())
    }

    fn budget_left(&self) -> bool {
        self.trace.len() < self.config.max_fits
    }

    fn best_ic(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, ic)| *ic)
    }

    /// Fit `spec` unless it is out of bounds, already visited, or over budget.
    ///
    /// Returns the criterion value when the candidate has a fit.
    fn try_fit(&mut self, spec: ArimaSpec) -> Option<f64> {
        if let Some(cached) = self.visited.get(&spec) {
            return *cached;
        }
        if !self.budget_left() {
            return None;
        }

        let result = ArimaModel::fit(self.y, spec, &self.opts);
        let ic = match result {
            Ok(model) => {
                let ic = model.summary().criterion(self.config.criterion);
                debug!(
                    candidate = %spec,
                    criterion = self.config.criterion.display_name(),
                    value = ic,
                    iterations = model.iterations,
                    "fitted candidate"
                );
                self.trace.push(CandidateRecord {
                    spec,
                    status: CandidateStatus::Fitted(ic),
                });
                if self.best_ic().is_none_or(|best| ic < best) {
                    self.best = Some((model, ic));
                }
                Some(ic)
            }
            Err(err) => {
                warn!(candidate = %spec, reason = %err, "skipped candidate");
                self.trace.push(CandidateRecord {
                    spec,
                    status: CandidateStatus::Skipped(err.to_string()),
                });
                self.errors.push(err);
                None
            }
        };
        self.visited.insert(spec, ic);
        ic
    }

    fn stepwise(&mut self) {
        let intercept = self.allow_intercept();
        let start_p = self.config.start_p.min(self.config.max_p);
        let start_q = self.config.start_q.min(self.config.max_q);

        let mut starts = vec![
            self.spec(start_p, start_q, intercept),
            self.spec(0, 0, intercept),
            self.spec(1, 0, intercept),
            self.spec(0, 1, intercept),
        ];
        if intercept {
            starts.push(self.spec(0, 0, false));
        }
        for spec in starts {
            if self.in_bounds(&spec) {
                self.try_fit(spec);
            }
        }

        while self.budget_left() {
            let Some((current, current_ic)) = self.best.as_ref().map(|(m, ic)| (m.spec, *ic)) else {
                return;
            };
            let mut moved = false;
            for (dp, dq, toggle) in NEIGHBOURS {
                let Some(candidate) = self.neighbour(&current, dp, dq, toggle) else {
                    continue;
                };
                if let Some(ic) = self.try_fit(candidate) {
                    if ic < current_ic {
                        moved = true;
                        break;
                    }
                }
                if !self.budget_left() {
                    break;
                }
            }
            if !moved {
                return;
            }
        }
        debug!(max_fits = self.config.max_fits, "stepwise search stopped at the fit budget");
    }

    fn neighbour(&self, from: &ArimaSpec, dp: isize, dq: isize, toggle: bool) -> Option<ArimaSpec> {
        let p = from.order.p.checked_add_signed(dp)?;
        let q = from.order.q.checked_add_signed(dq)?;
        let with_intercept = from.with_intercept ^ toggle;
        let spec = self.spec(p, q, with_intercept);
        self.in_bounds(&spec).then_some(spec)
    }

    /// Every in-bounds candidate, in `(p, q, intercept)` order.
    fn grid(&self) -> Vec<ArimaSpec> {
        let intercepts: &[bool] = if self.allow_intercept() { &[true, false] } else { &[false] };
        let mut out = Vec::new();
        for p in 0..=self.config.max_p {
            for q in 0..=self.config.max_q {
                for &with_intercept in intercepts {
                    let spec = self.spec(p, q, with_intercept);
                    if self.in_bounds(&spec) {
                        out.push(spec);
                    }
                }
            }
        }
        out
    }

    fn visit_all(&mut self, specs: &[ArimaSpec]) {
        for &spec in specs {
            if !self.budget_left() {
                break;
            }
            self.try_fit(spec);
        }
    }

    fn finish(self, strategy: Option<SearchStrategy>) -> Result<(ArimaModel, SearchTrace), FitError> {
        let trace = SearchTrace {
            strategy,
            criterion: self.config.criterion,
            d: self.d,
            candidates: self.trace,
        };
        match self.best {
            Some((model, _)) => Ok((model, trace)),
            None => Err(no_fit_error(self.errors, trace.candidates.len())),
        }
    }
}

/// Pick the error to report when no candidate could be fitted.
fn no_fit_error(errors: Vec<FitError>, attempted: usize) -> FitError {
    let all_short = !errors.is_empty() && errors.iter().all(|e| matches!(e, FitError::InsufficientData { .. }));
    if all_short {
        // The least demanding candidate is the actionable one.
        if let Some(err) = errors.iter().min_by_key(|e| match e {
            FitError::InsufficientData { needed, .. } => *needed,
            _ => usize::MAX,
        }) {
            return err.clone();
        }
    }
    if let [only] = errors.as_slice() {
        return only.clone();
    }
    FitError::NoConvergence(format!("none of the {attempted} candidate orders could be fitted"))
}
