//! Time-series statistics used by the order search.
//!
//! - differencing helpers
//! - KPSS level-stationarity test and the `ndiffs` rule built on it
//! - stationarity/invertibility checks for lag polynomials

/// KPSS (level) critical values, paired with their upper-tail probabilities.
const KPSS_LEVEL_TABLE: [(f64, f64); 4] = [(0.347, 0.10), (0.463, 0.05), (0.574, 0.025), (0.739, 0.01)];

/// Margin kept inside the unit circle when checking polynomial roots.
const ROOT_MARGIN: f64 = 1e-6;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Population variance.
pub fn variance(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64
}

/// `true` when every value equals the first (up to a scale-relative tolerance).
pub fn is_constant(x: &[f64]) -> bool {
    let Some(&first) = x.first() else {
        return true;
    };
    let scale = 1.0 + first.abs();
    x.iter().all(|v| (v - first).abs() <= 1e-12 * scale)
}

/// Difference a series `d` times.
pub fn difference(x: &[f64], d: usize) -> Vec<f64> {
    let mut out = x.to_vec();
    for _ in 0..d {
        if out.len() < 2 {
            return Vec::new();
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Last value of each differencing level `0..d` (level 0 is the series itself).
///
/// These are the anchors needed to undo differencing on a forecast.
pub fn difference_tails(x: &[f64], d: usize) -> Vec<f64> {
    let mut tails = Vec::with_capacity(d);
    let mut level = x.to_vec();
    for _ in 0..d {
        match level.last() {
            Some(&v) => tails.push(v),
            None => break,
        }
        level = difference(&level, 1);
    }
    tails
}

/// Undo `tails.len()` levels of differencing on a forecast of the differenced series.
pub fn integrate(diff_forecast: &[f64], tails: &[f64]) -> Vec<f64> {
    let mut out = diff_forecast.to_vec();
    for &anchor in tails.iter().rev() {
        let mut level = anchor;
        for v in out.iter_mut() {
            level += *v;
            *v = level;
        }
    }
    out
}

/// KPSS statistic for the null of level stationarity.
///
/// Long-run variance uses a Bartlett kernel with `trunc(3 * sqrt(n) / 13)` lags.
pub fn kpss_level_statistic(x: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 3 {
        return None;
    }
    let m = mean(x);
    let e: Vec<f64> = x.iter().map(|v| v - m).collect();

    let mut partial = 0.0;
    let mut eta = 0.0;
    for v in &e {
        partial += v;
        eta += partial * partial;
    }
    let nf = n as f64;
    eta /= nf * nf;

    let lags = ((3.0 * nf.sqrt() / 13.0).trunc() as usize).min(n - 1);
    let gamma = |lag: usize| -> f64 { e[lag..].iter().zip(&e[..n - lag]).map(|(a, b)| a * b).sum::<f64>() / nf };

    let mut s2 = gamma(0);
    for l in 1..=lags {
        let w = 1.0 - l as f64 / (lags as f64 + 1.0);
        s2 += 2.0 * w * gamma(l);
    }

    if !(s2.is_finite() && s2 > 0.0) {
        return None;
    }
    Some(eta / s2)
}

/// Interpolated p-value for a KPSS level statistic, clipped to `[0.01, 0.10]`.
pub fn kpss_p_value(stat: f64) -> f64 {
    let (first_stat, first_p) = KPSS_LEVEL_TABLE[0];
    if stat <= first_stat {
        return first_p;
    }
    for pair in KPSS_LEVEL_TABLE.windows(2) {
        let (s0, p0) = pair[0];
        let (s1, p1) = pair[1];
        if stat <= s1 {
            let u = (stat - s0) / (s1 - s0);
            return p0 + u * (p1 - p0);
        }
    }
    KPSS_LEVEL_TABLE[KPSS_LEVEL_TABLE.len() - 1].1
}

/// Whether the KPSS test rejects level stationarity at `alpha`.
pub fn kpss_should_diff(x: &[f64], alpha: f64) -> bool {
    match kpss_level_statistic(x) {
        Some(stat) => kpss_p_value(stat) < alpha,
        None => false,
    }
}

/// Number of differences needed for (KPSS) level stationarity, at most `max_d`.
pub fn ndiffs(x: &[f64], alpha: f64, max_d: usize) -> usize {
    if is_constant(x) {
        return 0;
    }
    let mut d = 0;
    let mut level = x.to_vec();
    while d < max_d && kpss_should_diff(&level, alpha) {
        d += 1;
        level = difference(&level, 1);
        if is_constant(&level) {
            break;
        }
    }
    d
}

/// Whether `y_t = Σ φ_i y_{t-i} + ...` is stationary (all roots of
/// `1 - φ_1 z - ... - φ_p z^p` outside the unit circle).
///
/// Uses the Durbin–Levinson step-down recursion: the polynomial is stationary
/// iff every implied partial autocorrelation has modulus below one.
pub fn ar_is_stationary(phi: &[f64]) -> bool {
    if phi.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let mut a = phi.to_vec();
    while let Some(&r) = a.last() {
        if r.abs() >= 1.0 - ROOT_MARGIN {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - r * r;
        let next: Vec<f64> = (0..k - 1).map(|j| (a[j] + r * a[k - 2 - j]) / denom).collect();
        a = next;
    }
    true
}

/// Whether `... + ε_t + Σ θ_j ε_{t-j}` is invertible (all roots of
/// `1 + θ_1 z + ... + θ_q z^q` outside the unit circle).
pub fn ma_is_invertible(theta: &[f64]) -> bool {
    let negated: Vec<f64> = theta.iter().map(|v| -v).collect();
    ar_is_stationary(&negated)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, mean-reverting oscillation (bounded partial sums).
    fn oscillation(n: usize) -> Vec<f64> {
        (0..n)
            .map(|t| {
                let t = t as f64;
                (1.3 * t).sin() + 0.5 * (0.7 * t).cos()
            })
            .collect()
    }

    #[test]
    fn difference_and_integrate_round_trip() {
        let data = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&data, 1), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(difference(&data, 2), vec![1.0, 1.0, 1.0]);
        assert_eq!(difference_tails(&data, 2), vec![15.0, 5.0]);

        // Continue the second differences (all 1.0) for three steps.
        let restored = integrate(&[1.0, 1.0, 1.0], &difference_tails(&data, 2));
        assert_eq!(restored, vec![21.0, 28.0, 36.0]);
    }

    #[test]
    fn is_constant_detects_flat_series() {
        assert!(is_constant(&[5.0, 5.0, 5.0]));
        assert!(is_constant(&[]));
        assert!(!is_constant(&[5.0, 5.0, 5.1]));
    }

    #[test]
    fn kpss_p_value_interpolates_table() {
        assert_eq!(kpss_p_value(0.1), 0.10);
        assert_eq!(kpss_p_value(2.0), 0.01);
        assert!((kpss_p_value(0.463) - 0.05).abs() < 1e-12);
        let mid = kpss_p_value(0.5);
        assert!(mid < 0.05 && mid > 0.025);
    }

    #[test]
    fn ndiffs_stationary_oscillation_is_zero() {
        assert_eq!(ndiffs(&oscillation(300), 0.05, 2), 0);
    }

    #[test]
    fn ndiffs_integrated_series_is_one() {
        let mut level = 100.0;
        let walk: Vec<f64> = oscillation(300)
            .iter()
            .map(|s| {
                level += s + 0.2;
                level
            })
            .collect();
        assert_eq!(ndiffs(&walk, 0.05, 2), 1);
    }

    #[test]
    fn ndiffs_linear_trend_stops_on_constant_difference() {
        let trend: Vec<f64> = (0..100).map(|t| 50.0 + 0.5 * t as f64).collect();
        assert_eq!(ndiffs(&trend, 0.05, 2), 1);
        assert_eq!(ndiffs(&[3.0; 40], 0.05, 2), 0);
    }

    #[test]
    fn ar_stationarity_matches_known_cases() {
        assert!(ar_is_stationary(&[]));
        assert!(ar_is_stationary(&[0.5]));
        assert!(!ar_is_stationary(&[1.0]));
        assert!(!ar_is_stationary(&[-1.2]));
        // AR(2) triangle: φ1 + φ2 < 1, φ2 - φ1 < 1, |φ2| < 1.
        assert!(ar_is_stationary(&[0.5, 0.3]));
        assert!(!ar_is_stationary(&[0.8, 0.3]));
        assert!(!ar_is_stationary(&[0.2, -1.1]));
    }

    #[test]
    fn ma_invertibility_matches_known_cases() {
        assert!(ma_is_invertible(&[0.4]));
        assert!(ma_is_invertible(&[-0.9]));
        assert!(!ma_is_invertible(&[-1.0]));
        assert!(!ma_is_invertible(&[1.5]));
    }
}
