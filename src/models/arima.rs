//! Non-seasonal ARIMA(p, d, q) estimation and forecasting.
//!
//! Model, on the `d`-times differenced series `w_t` centred on the intercept `μ`
//! (`z_t = w_t - μ`, or `z_t = w_t` without an intercept):
//!
//! ```text
//! z_t = φ_1 z_{t-1} + ... + φ_p z_{t-p} + ε_t + θ_1 ε_{t-1} + ... + θ_q ε_{t-q}
//! ```
//!
//! Estimation is conditional sum of squares (CSS): pre-sample `z` and `ε` are
//! set to zero, so every candidate of a search is scored on the same `n`.
//! Start values come from Hannan–Rissanen regressions; the CSS objective is then
//! refined with Nelder–Mead, restricted to the stationary/invertible region.

use crate::domain::{ArimaOrder, ModelSummary};
use crate::error::FitError;
use crate::math::{
    ar_is_stationary, difference, difference_tails, integrate, is_constant, ma_is_invertible, mean,
    nelder_mead, regress_rows, variance, SimplexOptions,
};

/// Extra observations required beyond the parameter count.
const MIN_DOF: usize = 3;
/// `σ²` floor relative to the mean square of the differenced series.
const SIGMA2_FLOOR_REL: f64 = 1e-12;
/// Simplex diameter tolerance; coefficients are reported to far fewer digits.
const SIMPLEX_X_TOL: f64 = 1e-6;
/// Upper bound on the long-AR order used for Hannan–Rissanen start values.
const HR_MAX_LONG_AR: usize = 10;

/// Order plus intercept choice: one candidate of the order search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArimaSpec {
    pub order: ArimaOrder,
    pub with_intercept: bool,
}

impl ArimaSpec {
    pub const fn new(order: ArimaOrder, with_intercept: bool) -> Self {
        Self { order, with_intercept }
    }

    /// Number of estimated mean-equation parameters (excludes `σ²`).
    pub fn n_params(&self) -> usize {
        self.order.p + self.order.q + usize::from(self.with_intercept)
    }

    /// Minimum length of the undifferenced series this spec can be fitted on.
    pub fn min_observations(&self) -> usize {
        self.order.d + self.n_params() + MIN_DOF
    }
}

impl std::fmt::Display for ArimaSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.with_intercept {
            write!(f, "{} with intercept", self.order)
        } else {
            write!(f, "{}", self.order)
        }
    }
}

/// Estimation options.
#[derive(Debug, Clone, Copy)]
pub struct ArimaFitOptions {
    pub max_iter: usize,
}

impl Default for ArimaFitOptions {
    fn default() -> Self {
        Self { max_iter: 2000 }
    }
}

/// A fitted ARIMA model, including the state needed to forecast past the end
/// of the series it was fitted on.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    pub spec: ArimaSpec,
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
    pub iterations: usize,
    /// Last value of each differencing level, level 0 first.
    tails: Vec<f64>,
    /// Last `p` centred differenced values, oldest first.
    recent_z: Vec<f64>,
    /// Last `q` residuals, oldest first.
    recent_e: Vec<f64>,
}

impl ArimaModel {
    /// Fit `spec` on `y`.
    pub fn fit(y: &[f64], spec: ArimaSpec, opts: &ArimaFitOptions) -> Result<Self, FitError> {
        if let Some(index) = y.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { index });
        }
        let needed = spec.min_observations();
        if y.len() < needed {
            return Err(FitError::InsufficientData { needed, got: y.len() });
        }

        let ArimaOrder { p, d, q } = spec.order;
        let w = difference(y, d);
        let n = w.len();

        if is_constant(&w) && p + q > 0 {
            return Err(FitError::Degenerate(format!(
                "differenced series is constant; {} terms are not identifiable",
                spec.order
            )));
        }

        let mu0 = if spec.with_intercept { mean(&w) } else { 0.0 };
        let scale = {
            let sd = variance(&w).sqrt();
            if sd > 0.0 { sd } else { 1.0 }
        };

        let (intercept, ar, ma, iterations) = if p + q == 0 {
            (mu0, Vec::new(), Vec::new(), 0)
        } else {
            let z0: Vec<f64> = w.iter().map(|v| v - mu0).collect();
            let (phi0, theta0) = hannan_rissanen(&z0, p, q);

            // Parameter vector: [μ offset in sd units]? ++ φ ++ θ.
            let mut x0 = Vec::with_capacity(spec.n_params());
            if spec.with_intercept {
                x0.push(0.0);
            }
            x0.extend_from_slice(&phi0);
            x0.extend_from_slice(&theta0);

            let unpack = |x: &[f64]| -> (f64, Vec<f64>, Vec<f64>) {
                let (mu, rest) = if spec.with_intercept {
                    (mu0 + x[0] * scale, &x[1..])
                } else {
                    (0.0, x)
                };
                (mu, rest[..p].to_vec(), rest[p..p + q].to_vec())
            };

            let norm = n as f64 * scale * scale;
            let objective = |x: &[f64]| -> f64 {
                let (mu, phi, theta) = unpack(x);
                if !ar_is_stationary(&phi) || !ma_is_invertible(&theta) {
                    return f64::INFINITY;
                }
                let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
                css_residuals(&z, &phi, &theta).iter().map(|e| e * e).sum::<f64>() / norm
            };

            let min = nelder_mead(
                objective,
                &x0,
                SimplexOptions {
                    max_iter: opts.max_iter,
                    x_tol: SIMPLEX_X_TOL,
                    ..SimplexOptions::default()
                },
            );
            if !min.fx.is_finite() {
                return Err(FitError::NoConvergence(format!(
                    "{spec}: no stationary and invertible parameters found"
                )));
            }
            if !min.converged {
                return Err(FitError::NoConvergence(format!(
                    "{spec}: optimizer did not converge in {} iterations",
                    min.iterations
                )));
            }
            let (mu, phi, theta) = unpack(&min.x);
            (mu, phi, theta, min.iterations)
        };

        let z: Vec<f64> = w.iter().map(|v| v - intercept).collect();
        let residuals = css_residuals(&z, &ar, &ma);
        let sse: f64 = residuals.iter().map(|e| e * e).sum();

        let nf = n as f64;
        let mean_square = w.iter().map(|v| v * v).sum::<f64>() / nf;
        let floor = SIGMA2_FLOOR_REL * mean_square.max(f64::MIN_POSITIVE);
        let sigma2 = (sse / nf).max(floor);

        let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = (spec.n_params() + 1) as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let aicc = if nf - k - 1.0 > 0.0 {
            aic + 2.0 * k * (k + 1.0) / (nf - k - 1.0)
        } else {
            f64::INFINITY
        };
        let bic = -2.0 * log_likelihood + k * nf.ln();

        if !(aic.is_finite() && bic.is_finite()) {
            return Err(FitError::NoConvergence(format!("{spec}: non-finite likelihood")));
        }

        Ok(Self {
            spec,
            intercept,
            ar,
            ma,
            sigma2,
            log_likelihood,
            aic,
            aicc,
            bic,
            n_obs: n,
            iterations,
            tails: difference_tails(y, d),
            recent_z: z[n.saturating_sub(p)..].to_vec(),
            recent_e: residuals[n.saturating_sub(q)..].to_vec(),
        })
    }

    /// Forecast `h` steps past the end of the fitted series.
    ///
    /// Future innovations are set to their expectation (zero).
    pub fn forecast(&self, h: usize) -> Vec<f64> {
        let mut z_hist = self.recent_z.clone();
        let mut e_hist = self.recent_e.clone();
        let mut w_hat = Vec::with_capacity(h);

        for _ in 0..h {
            let mut pred = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                if let Some(z) = z_hist.len().checked_sub(i + 1).and_then(|idx| z_hist.get(idx)) {
                    pred += phi * z;
                }
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if let Some(e) = e_hist.len().checked_sub(j + 1).and_then(|idx| e_hist.get(idx)) {
                    pred += theta * e;
                }
            }
            z_hist.push(pred);
            e_hist.push(0.0);
            w_hat.push(pred + self.intercept);
        }

        integrate(&w_hat, &self.tails)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            order: self.spec.order,
            with_intercept: self.spec.with_intercept,
            intercept: self.intercept,
            ar: self.ar.clone(),
            ma: self.ma.clone(),
            sigma2: self.sigma2,
            log_likelihood: self.log_likelihood,
            aic: self.aic,
            aicc: self.aicc,
            bic: self.bic,
            n_obs: self.n_obs,
        }
    }
}

/// One-step-ahead residuals of an ARMA recursion with zero pre-sample values.
pub fn css_residuals(z: &[f64], phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; z.len()];
    for t in 0..z.len() {
        let mut pred = 0.0;
        for (i, a) in phi.iter().enumerate() {
            if t > i {
                pred += a * z[t - i - 1];
            }
        }
        for (j, b) in theta.iter().enumerate() {
            if t > j {
                pred += b * e[t - j - 1];
            }
        }
        e[t] = z[t] - pred;
    }
    e
}

/// Hannan–Rissanen start values for `(φ, θ)` on a centred series.
///
/// Falls back to zeros for any block that cannot be estimated or lands outside
/// the stationary/invertible region.
fn hannan_rissanen(z: &[f64], p: usize, q: usize) -> (Vec<f64>, Vec<f64>) {
    let zeros = (vec![0.0; p], vec![0.0; q]);
    let n = z.len();

    let estimate = if q == 0 {
        lagged_regression(z, &[], p, 0, p)
    } else {
        let m = (p + q).max(HR_MAX_LONG_AR.min(n / 4));
        if n <= 2 * m + p + q + 1 {
            return zeros;
        }
        let Some(long_ar) = lagged_regression(z, &[], m, 0, m) else {
            return zeros;
        };
        // Residuals of the long AR; zero where not available.
        let mut e_hat = vec![0.0; n];
        for t in m..n {
            let fitted: f64 = (0..m).map(|i| long_ar[i] * z[t - i - 1]).sum();
            e_hat[t] = z[t] - fitted;
        }
        lagged_regression(z, &e_hat, p, q, m + q)
    };

    let Some(beta) = estimate else {
        return zeros;
    };
    let mut phi = beta[..p].to_vec();
    let mut theta = beta[p..p + q].to_vec();
    if !ar_is_stationary(&phi) {
        phi = vec![0.0; p];
    }
    if !ma_is_invertible(&theta) {
        theta = vec![0.0; q];
    }
    (phi, theta)
}

/// Regress `z_t` on `p` lags of `z` and `q` lags of `e`, for `t >= start`.
fn lagged_regression(z: &[f64], e: &[f64], p: usize, q: usize, start: usize) -> Option<Vec<f64>> {
    let n = z.len();
    if start >= n {
        return None;
    }
    let rows: Vec<Vec<f64>> = (start..n)
        .map(|t| {
            let mut row = Vec::with_capacity(p + q);
            row.extend((1..=p).map(|i| z[t - i]));
            row.extend((1..=q).map(|j| e[t - j]));
            row
        })
        .collect();
    regress_rows(&rows, &z[start..])
}
