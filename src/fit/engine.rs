//! Forecast engine: hold-out evaluation, full refit and forward forecast.
//!
//! ```text
//! series ──split──► train ──select+fit──► forecast len(test) ──► RMSE vs test
//!    └────────────────────select+fit──► forecast horizon
//! ```
//!
//! The evaluation forecast is a single multi-step forecast from the end of the
//! training window (no rolling refit).

use tracing::{debug, info};

use crate::domain::{
    Evaluation, TrainTestSplit, MAX_HORIZON, MAX_TEST_PERCENTAGE, MIN_HORIZON, MIN_TEST_PERCENTAGE,
};
use crate::error::FitError;
use crate::fit::search::MIN_SERIES_LEN;
use crate::fit::selector::{FittedModel, ModelSelector};

/// Output of `evaluate_and_forecast`.
#[derive(Debug, Clone)]
pub struct ForecastResult {
    pub evaluation: Evaluation,
    /// `horizon` values following the last observation.
    pub forecast: Vec<f64>,
    /// Model fitted on the training window (absent when evaluation was skipped).
    pub evaluation_model: Option<FittedModel>,
    /// Model fitted on the full series.
    pub model: FittedModel,
}

/// Root-mean-squared error; `None` for empty or mismatched inputs.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let sse: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    Some((sse / actual.len() as f64).sqrt())
}

/// Hold-out evaluation only.
///
/// Returns `Evaluation::Skipped` when the test side is empty or the training
/// side is too short to fit.
pub fn evaluate(
    series: &[f64],
    test_percentage: u32,
    selector: &dyn ModelSelector,
) -> Result<(Evaluation, Option<FittedModel>), FitError> {
    check_test_percentage(test_percentage)?;
    let split = TrainTestSplit::new(series.len(), test_percentage);

    if split.test_len == 0 {
        let reason = format!(
            "{test_percentage}% of {} observations leaves no test data",
            series.len()
        );
        debug!(%reason, "evaluation skipped");
        return Ok((Evaluation::Skipped { reason }, None));
    }
    if split.train_len < MIN_SERIES_LEN {
        let reason = format!(
            "{test_percentage}% of {} observations leaves {} training observations (need {MIN_SERIES_LEN})",
            series.len(),
            split.train_len
        );
        debug!(%reason, "evaluation skipped");
        return Ok((Evaluation::Skipped { reason }, None));
    }

    let train = split.train(series);
    let test = split.test(series);
    let fitted = selector.select_and_fit(train)?;
    let predicted = fitted.forecast(test.len());
    let rmse = rmse(test, &predicted).ok_or_else(|| {
        FitError::InvalidParameter(format!(
            "evaluation forecast has {} values for {} test observations",
            predicted.len(),
            test.len()
        ))
    })?;

    info!(
        train = split.train_len,
        test = split.test_len,
        model = %fitted.model.spec,
        rmse,
        "evaluation pass done"
    );
    Ok((
        Evaluation::Scored {
            rmse,
            train_len: split.train_len,
            test_len: split.test_len,
        },
        Some(fitted),
    ))
}

/// Evaluate on a hold-out split, then refit on everything and forecast
/// `horizon` steps ahead.
pub fn evaluate_and_forecast(
    series: &[f64],
    test_percentage: u32,
    horizon: usize,
    selector: &dyn ModelSelector,
) -> Result<ForecastResult, FitError> {
    check_horizon(horizon)?;
    if let Some(index) = series.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFinite { index });
    }

    let (evaluation, evaluation_model) = evaluate(series, test_percentage, selector)?;

    let model = selector.select_and_fit(series)?;
    let forecast = model.forecast(horizon);
    info!(model = %model.model.spec, horizon, "forecast pass done");

    Ok(ForecastResult {
        evaluation,
        forecast,
        evaluation_model,
        model,
    })
}

fn check_horizon(horizon: usize) -> Result<(), FitError> {
    if !(MIN_HORIZON..=MAX_HORIZON).contains(&horizon) {
        return Err(FitError::InvalidParameter(format!(
            "horizon must be in {MIN_HORIZON}..={MAX_HORIZON} (got {horizon})"
        )));
    }
    Ok(())
}

fn check_test_percentage(pct: u32) -> Result<(), FitError> {
    if !(MIN_TEST_PERCENTAGE..=MAX_TEST_PERCENTAGE).contains(&pct) {
        return Err(FitError::InvalidParameter(format!(
            "test percentage must be in {MIN_TEST_PERCENTAGE}..={MAX_TEST_PERCENTAGE} (got {pct})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArimaOrder, SearchConfig};
    use crate::fit::selector::{AutoArima, FixedArima};
    use crate::models::ArimaSpec;
    use approx::assert_abs_diff_eq;

    fn trend(n: usize) -> Vec<f64> {
        (0..n).map(|t| 100.0 + 0.5 * t as f64).collect()
    }

    fn random_walk_selector() -> FixedArima {
        FixedArima {
            spec: ArimaSpec::new(ArimaOrder::new(0, 1, 0), false),
            config: SearchConfig::default(),
        }
    }

    #[test]
    fn rmse_basics() {
        assert_eq!(rmse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), Some(0.0));
        assert_abs_diff_eq!(rmse(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 12.5f64.sqrt(), epsilon = 1e-12);
        assert_eq!(rmse(&[], &[]), None);
        assert_eq!(rmse(&[1.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn linear_trend_is_evaluated_and_continued() {
        let series = trend(100);
        let result = evaluate_and_forecast(&series, 20, 5, &AutoArima::default()).unwrap();

        match result.evaluation {
            Evaluation::Scored { rmse, train_len, test_len } => {
                assert_eq!(train_len, 80);
                assert_eq!(test_len, 20);
                assert!(rmse >= 0.0);
                assert!(rmse < 0.05 * 150.0, "rmse={rmse}");
            }
            other => panic!("expected a scored evaluation, got {other:?}"),
        }

        assert_eq!(result.forecast.len(), 5);
        for (i, v) in result.forecast.iter().enumerate() {
            let expected = 100.0 + 0.5 * (100 + i) as f64;
            assert_abs_diff_eq!(*v, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn random_walk_evaluation_matches_hand_computation() {
        let series = vec![1.0, 2.0, 4.0, 3.0, 5.0, 6.0, 4.0, 8.0, 7.0, 9.0];
        let (evaluation, _) = evaluate(&series, 30, &random_walk_selector()).unwrap();
        // Train ends at 4.0; the flat forecast is compared to [8, 7, 9].
        let expected = ((16.0 + 9.0 + 25.0) / 3.0f64).sqrt();
        assert_abs_diff_eq!(evaluation.rmse().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn forecast_length_matches_every_horizon() {
        let series = vec![3.0, 4.0, 3.5, 5.0, 4.5, 6.0];
        for horizon in MIN_HORIZON..=MAX_HORIZON {
            let result = evaluate_and_forecast(&series, 20, horizon, &random_walk_selector()).unwrap();
            assert_eq!(result.forecast.len(), horizon);
        }
    }

    #[test]
    fn single_point_skips_evaluation_then_fails_forecast() {
        let (evaluation, model) = evaluate(&[42.0], 20, &AutoArima::default()).unwrap();
        assert!(matches!(evaluation, Evaluation::Skipped { .. }));
        assert!(model.is_none());

        let err = evaluate_and_forecast(&[42.0], 20, 1, &AutoArima::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { got: 1, .. }));
    }

    #[test]
    fn full_test_percentage_skips_evaluation() {
        let (evaluation, _) = evaluate(&trend(10), 100, &random_walk_selector()).unwrap();
        match evaluation {
            Evaluation::Skipped { reason } => assert!(reason.contains("leaves 0 training")),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn short_training_window_skips_evaluation_but_still_forecasts() {
        let series = [10.0, 11.0, 13.0, 12.0];
        let result = evaluate_and_forecast(&series, 50, 2, &random_walk_selector()).unwrap();
        match result.evaluation {
            Evaluation::Skipped { reason } => assert!(reason.contains("leaves 2 training")),
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(result.evaluation_model.is_none());
        assert_eq!(result.forecast, vec![12.0, 12.0]);
    }

    #[test]
    fn parameters_out_of_range_are_rejected() {
        let series = trend(20);
        let selector = random_walk_selector();
        assert!(matches!(
            evaluate_and_forecast(&series, 20, 0, &selector),
            Err(FitError::InvalidParameter(_))
        ));
        assert!(matches!(
            evaluate_and_forecast(&series, 20, 31, &selector),
            Err(FitError::InvalidParameter(_))
        ));
        assert!(matches!(
            evaluate_and_forecast(&series, 0, 1, &selector),
            Err(FitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn constant_and_non_finite_series_fail() {
        assert!(matches!(
            evaluate_and_forecast(&[5.0; 40], 20, 1, &AutoArima::default()),
            Err(FitError::Degenerate(_))
        ));
        assert!(matches!(
            evaluate_and_forecast(&[1.0, f64::INFINITY, 2.0], 20, 1, &AutoArima::default()),
            Err(FitError::NonFinite { index: 1 })
        ));
    }

    #[test]
    fn results_are_deterministic() {
        let series: Vec<f64> = (0..120)
            .map(|t| {
                let t = t as f64;
                50.0 + 0.1 * t + (0.9 * t).sin() + 0.3 * (2.3 * t).cos()
            })
            .collect();
        let a = evaluate_and_forecast(&series, 20, 7, &AutoArima::default()).unwrap();
        let b = evaluate_and_forecast(&series, 20, 7, &AutoArima::default()).unwrap();
        assert_eq!(a.evaluation, b.evaluation);
        assert_eq!(a.forecast, b.forecast);
        assert_eq!(a.model.model.spec, b.model.model.spec);
    }
}
