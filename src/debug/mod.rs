//! Debug bundle writer: one Markdown file describing a forecast run.
//!
//! The bundle holds the request, the data summary, every candidate the order
//! search tried (for the evaluation and the final fit) and the forecast, so a
//! surprising model choice can be inspected after the fact.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::ForecastResponse;
use crate::error::{AppError, EXIT_INTERNAL};
use crate::fit::{CandidateStatus, FittedModel};

/// Trailing price rows included in the bundle.
const PRICE_ROWS: usize = 60;

/// Write the bundle under `dir` and return its path.
pub fn write_debug_bundle(
    dir: &Path,
    response: &ForecastResponse,
    source_name: &str,
    selector: &str,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to create debug dir: {e}")))?;

    let now = Local::now();
    let ticker = if response.ticker.is_empty() { "none" } else { response.ticker.as_str() };
    let path = dir.join(format!("pf_debug_{ticker}_{}.md", now.format("%Y%m%d_%H%M%S")));

    let text = render_debug_bundle(response, source_name, selector, &now.to_rfc3339());
    std::fs::write(&path, text)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to write debug file '{}': {e}", path.display())))?;
    Ok(path)
}

pub fn render_debug_bundle(response: &ForecastResponse, source_name: &str, selector: &str, generated: &str) -> String {
    let mut out = String::new();
    // `fmt::Write` for `String` cannot fail.
    let _ = write_bundle(&mut out, response, source_name, selector, generated);
    out
}

fn write_bundle(
    out: &mut String,
    response: &ForecastResponse,
    source_name: &str,
    selector: &str,
    generated: &str,
) -> std::fmt::Result {
    writeln!(out, "# pf debug bundle")?;
    writeln!(out, "- generated: {generated}")?;
    writeln!(out, "- ticker: {}", response.ticker)?;
    writeln!(out, "- source: {source_name}")?;
    writeln!(out, "- selector: {selector}")?;
    match response.date_range {
        Some(r) => writeln!(out, "- range: {} .. {} (end exclusive)", r.start, r.end)?,
        None => writeln!(out, "- range: full history")?,
    }
    writeln!(out, "- observations: {}", response.series.len())?;

    if !response.errors.is_empty() {
        writeln!(out, "\n## Errors")?;
        for e in &response.errors {
            writeln!(out, "- {e}")?;
        }
    }

    if let Some(evaluation) = &response.evaluation {
        writeln!(out, "\n## Evaluation")?;
        writeln!(out, "{}", crate::report::format_evaluation(evaluation))?;
    }

    if let Some(model) = &response.evaluation_model {
        writeln!(out, "\n## Training-window search")?;
        write_fit(out, model)?;
    }
    if let Some(model) = &response.model {
        writeln!(out, "\n## Full-series search")?;
        write_fit(out, model)?;
    }

    if let Some(forecast) = &response.forecast {
        writeln!(out, "\n## Forecast")?;
        writeln!(out, "| date | prediction |")?;
        writeln!(out, "| - | - |")?;
        for p in &forecast.points {
            writeln!(out, "| {} | {:.6} |", p.date, p.prediction)?;
        }
    }

    let points = response.series.points();
    if !points.is_empty() {
        let shown = &points[points.len().saturating_sub(PRICE_ROWS)..];
        writeln!(out, "\n## Prices (last {})", shown.len())?;
        writeln!(out, "| date | adj_close |")?;
        writeln!(out, "| - | - |")?;
        for p in shown {
            writeln!(out, "| {} | {:.6} |", p.date, p.price)?;
        }
    }
    Ok(())
}

fn write_fit(out: &mut String, fitted: &FittedModel) -> std::fmt::Result {
    let summary = fitted.summary();
    let ic = fitted.trace.criterion.display_name();
    writeln!(out, "Chosen: {} (d from KPSS: {})", summary.display_name(), fitted.trace.d)?;
    writeln!(
        out,
        "AIC={:.4} AICc={:.4} BIC={:.4} sigma2={:.6} loglik={:.4} n={}",
        summary.aic, summary.aicc, summary.bic, summary.sigma2, summary.log_likelihood, summary.n_obs
    )?;
    writeln!(out, "intercept={:.6} ar={} ma={}", summary.intercept, fmt_vec(&summary.ar), fmt_vec(&summary.ma))?;

    writeln!(out, "\n| candidate | {ic} | note |")?;
    writeln!(out, "| - | - | - |")?;
    for c in &fitted.trace.candidates {
        match &c.status {
            CandidateStatus::Fitted(value) => writeln!(out, "| {} | {value:.4} | |", c.spec)?,
            CandidateStatus::Skipped(reason) => writeln!(out, "| {} | - | {reason} |", c.spec)?,
        }
    }
    Ok(())
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
