//! Derivative-free minimization (Nelder–Mead simplex).
//!
//! The ARIMA estimator minimizes a conditional sum of squares over a handful of
//! coefficients. The objective is cheap but not smooth everywhere (we return
//! `+∞` outside the stationary/invertible region), so a simplex method is a
//! better fit than a gradient method here.
//!
//! The implementation is fully deterministic: same objective, same start, same
//! result.

/// Options for `nelder_mead`.
#[derive(Debug, Clone, Copy)]
pub struct SimplexOptions {
    /// Initial simplex edge length (absolute, per coordinate).
    pub step: f64,
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values across the simplex.
    pub f_tol: f64,
    /// Convergence tolerance on the simplex diameter.
    pub x_tol: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            step: 0.1,
            max_iter: 2000,
            f_tol: 1e-10,
            x_tol: 1e-8,
        }
    }
}

/// Minimization result.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub fx: f64,
    pub iterations: usize,
    pub converged: bool,
}

const ALPHA: f64 = 1.0; // reflection
const GAMMA: f64 = 2.0; // expansion
const RHO: f64 = 0.5; // contraction
const SIGMA: f64 = 0.5; // shrink

/// Minimize `f` starting from `x0`.
///
/// A zero-dimensional problem is returned as-is (converged).
pub fn nelder_mead<F>(f: F, x0: &[f64], opts: SimplexOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    if n == 0 {
        return Minimum {
            x: Vec::new(),
            fx: eval(x0),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] += opts.step;
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < opts.max_iter {
        iterations += 1;

        // Order vertices best → worst.
        let mut idx: Vec<usize> = (0..=n).collect();
        idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = idx.iter().map(|&i| simplex[i].clone()).collect();
        values = idx.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if best.is_finite() && worst.is_finite() {
            let f_spread = (worst - best).abs();
            let diameter = simplex[1..]
                .iter()
                .map(|v| max_abs_diff(v, &simplex[0]))
                .fold(0.0, f64::max);
            if f_spread <= opts.f_tol * (1.0 + best.abs()) && diameter <= opts.x_tol * (1.0 + norm_inf(&simplex[0])) {
                converged = true;
                break;
            }
        }

        let centroid = centroid(&simplex[..n]);

        let reflected = affine(&centroid, &simplex[n], -ALPHA);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = affine(&centroid, &simplex[n], -GAMMA);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        // Contraction: outside if the reflection helped a little, inside otherwise.
        let (contracted, f_contracted) = if f_reflected < values[n] {
            let c = affine(&centroid, &reflected, RHO);
            let fc = eval(&c);
            (c, fc)
        } else {
            let c = affine(&centroid, &simplex[n], RHO);
            let fc = eval(&c);
            (c, fc)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // Shrink towards the best vertex.
        let best_vertex = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = affine(&best_vertex, &simplex[i], SIGMA);
            values[i] = eval(&simplex[i]);
        }
    }

    let (best_i, _) = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .unwrap_or((0, &values[0]));

    Minimum {
        x: simplex[best_i].clone(),
        fx: values[best_i],
        iterations,
        converged,
    }
}

/// `c + t * (p - c)`.
fn affine(c: &[f64], p: &[f64], t: f64) -> Vec<f64> {
    c.iter().zip(p).map(|(ci, pi)| ci + t * (pi - ci)).collect()
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let dim = points[0].len();
    let mut out = vec![0.0; dim];
    for p in points {
        for (o, v) in out.iter_mut().zip(p) {
            *o += v;
        }
    }
    out.iter_mut().for_each(|o| *o /= n);
    out
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

fn norm_inf(a: &[f64]) -> f64 {
    a.iter().map(|v| v.abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_shifted_quadratic() {
        let f = |x: &[f64]| (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2);
        let m = nelder_mead(f, &[0.0, 0.0], SimplexOptions::default());
        assert!(m.converged);
        assert!((m.x[0] - 1.5).abs() < 1e-4, "x0={}", m.x[0]);
        assert!((m.x[1] + 0.5).abs() < 1e-4, "x1={}", m.x[1]);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let opts = SimplexOptions {
            max_iter: 5000,
            ..SimplexOptions::default()
        };
        let m = nelder_mead(f, &[-1.2, 1.0], opts);
        assert!((m.x[0] - 1.0).abs() < 1e-3);
        assert!((m.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn respects_infinite_barrier() {
        // Minimum of the unconstrained problem is at 2, but x >= 1 is forbidden.
        let f = |x: &[f64]| if x[0] >= 1.0 { f64::INFINITY } else { (x[0] - 2.0).powi(2) };
        let m = nelder_mead(f, &[0.0], SimplexOptions::default());
        assert!(m.x[0] < 1.0);
        assert!(m.x[0] > 0.99);
    }

    #[test]
    fn zero_dimensional_problem_is_trivial() {
        let m = nelder_mead(|_| 3.0, &[], SimplexOptions::default());
        assert!(m.converged);
        assert_eq!(m.fx, 3.0);
        assert_eq!(m.iterations, 0);
    }

    #[test]
    fn iteration_budget_is_reported() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let opts = SimplexOptions {
            max_iter: 3,
            ..SimplexOptions::default()
        };
        let m = nelder_mead(f, &[-1.2, 1.0], opts);
        assert!(!m.converged);
        assert_eq!(m.iterations, 3);
    }
}
