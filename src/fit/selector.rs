//! Pluggable model selection.
//!
//! The forecast engine only needs "give me a fitted model for this series";
//! `ModelSelector` is that seam. `AutoArima` runs the order search,
//! `FixedArima` fits a user-supplied order.

use crate::domain::{ArimaOrder, ModelSummary, SearchConfig};
use crate::error::FitError;
use crate::fit::search::{fit_fixed, search_arima, SearchTrace};
use crate::models::{ArimaModel, ArimaSpec};

/// A fitted model plus the record of how it was chosen.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub model: ArimaModel,
    pub trace: SearchTrace,
}

impl FittedModel {
    /// Forecast `n` steps past the end of the series the model was fitted on.
    pub fn forecast(&self, n: usize) -> Vec<f64> {
        self.model.forecast(n)
    }

    pub fn summary(&self) -> ModelSummary {
        self.model.summary()
    }
}

pub trait ModelSelector {
    /// Short description for logs and reports.
    fn describe(&self) -> String;

    fn select_and_fit(&self, series: &[f64]) -> Result<FittedModel, FitError>;
}

/// Automated order search.
#[derive(Debug, Clone, Default)]
pub struct AutoArima {
    pub config: SearchConfig,
}

impl AutoArima {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

impl ModelSelector for AutoArima {
    fn describe(&self) -> String {
        format!(
            "auto ARIMA ({:?} search, {}, max {} fits, seed {})",
            self.config.strategy,
            self.config.criterion.display_name(),
            self.config.max_fits,
            self.config.seed
        )
        .to_lowercase()
    }

    fn select_and_fit(&self, series: &[f64]) -> Result<FittedModel, FitError> {
        let (model, trace) = search_arima(series, &self.config)?;
        Ok(FittedModel { model, trace })
    }
}

/// A single fixed order, no search.
#[derive(Debug, Clone)]
pub struct FixedArima {
    pub spec: ArimaSpec,
    pub config: SearchConfig,
}

impl FixedArima {
    /// Fixed order; an intercept is included when `d <= 1`, as in the search.
    pub fn new(order: ArimaOrder, config: SearchConfig) -> Self {
        Self {
            spec: ArimaSpec::new(order, order.d <= 1),
            config,
        }
    }
}

impl ModelSelector for FixedArima {
    fn describe(&self) -> String {
        format!("fixed {}", self.spec)
    }

    fn select_and_fit(&self, series: &[f64]) -> Result<FittedModel, FitError> {
        let (model, trace) = fit_fixed(series, self.spec, &self.config)?;
        Ok(FittedModel { model, trace })
    }
}

/// Build the selector a search configuration asks for.
pub fn selector_from_config(config: &SearchConfig) -> Box<dyn ModelSelector> {
    match config.fixed_order {
        Some(order) => Box::new(FixedArima::new(order, config.clone())),
        None => Box::new(AutoArima::new(config.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_fixed_order_builds_fixed_selector() {
        let config = SearchConfig {
            fixed_order: Some(ArimaOrder::new(1, 1, 0)),
            ..SearchConfig::default()
        };
        let selector = selector_from_config(&config);
        assert_eq!(selector.describe(), "fixed ARIMA(1,1,0) with intercept");

        let auto = selector_from_config(&SearchConfig::default());
        assert!(auto.describe().starts_with("auto arima (stepwise search, aic"));
    }

    #[test]
    fn fixed_selector_forecasts_random_walk_flat() {
        let y = vec![10.0, 11.0, 10.5, 12.0, 11.0, 13.0, 12.5];
        let selector = FixedArima {
            spec: ArimaSpec::new(ArimaOrder::new(0, 1, 0), false),
            config: SearchConfig::default(),
        };
        let fitted = selector.select_and_fit(&y).unwrap();
        assert_eq!(fitted.forecast(3), vec![12.5; 3]);
        assert_eq!(fitted.trace.candidates.len(), 1);
    }

    #[test]
    fn fixed_order_without_intercept_for_second_differences() {
        let selector = FixedArima::new(ArimaOrder::new(0, 2, 1), SearchConfig::default());
        assert!(!selector.spec.with_intercept);
    }
}
