//! Formatted terminal output: run summary, search diagnostics and tables.
//!
//! We keep formatting code in one place so:
//! - the pipeline and model code stay free of presentation details
//! - output changes are localized (and pinned by the golden tests below)

use crate::app::pipeline::ForecastResponse;
use crate::domain::{Evaluation, ForecastSeries, ModelSummary, PriceSeries};
use crate::error::PipelineError;
use crate::fit::{CandidateStatus, SearchTrace};

/// Width of the model name column in the diagnostics table.
const NAME_WIDTH: usize = 32;

/// Format the run summary (dataset stats, evaluation, chosen model).
pub fn format_run_summary(response: &ForecastResponse, source_name: &str, selector: &str) -> String {
    let mut out = String::new();

    out.push_str("=== pf - AutoARIMA Stock Forecast ===\n");
    out.push_str(&format!("Ticker: {}\n", response.ticker));
    out.push_str(&format!("Source: {source_name}\n"));
    match response.date_range {
        Some(range) => out.push_str(&format!("Range: {} .. {} (end exclusive)\n", range.start, range.end)),
        None => out.push_str("Range: full history\n"),
    }
    out.push_str(&format_series_stats(&response.series));
    out.push_str(&format!("Selector: {selector}\n"));

    if let Some(evaluation) = &response.evaluation {
        out.push_str("\nEvaluation:\n");
        out.push_str(&format!("- {}\n", format_evaluation(evaluation)));
    }

    if let Some(model) = &response.model {
        out.push_str("\nModel (full series):\n");
        out.push_str(&format_model(&model.summary()));
    }
    if let Some(model) = &response.evaluation_model {
        out.push_str("\nModel (training window):\n");
        out.push_str(&format!("- {}\n", model.summary().display_name()));
    }
    out.push('\n');

    out
}

/// One-line price statistics.
pub fn format_series_stats(series: &PriceSeries) -> String {
    match (series.first(), series.last(), series.price_range()) {
        (Some(first), Some(last), Some((lo, hi))) => format!(
            "Prices: n={} | {} .. {} | price=[{:.2}, {:.2}]\n",
            series.len(),
            first.date,
            last.date,
            lo,
            hi
        ),
        _ => "Prices: n=0\n".to_string(),
    }
}

/// `RMSE: ...` or the reason the evaluation was skipped.
pub fn format_evaluation(evaluation: &Evaluation) -> String {
    match evaluation {
        Evaluation::Scored {
            rmse,
            train_len,
            test_len,
        } => format!("RMSE: {rmse:.6} (train={train_len}, test={test_len})"),
        Evaluation::Skipped { reason } => format!("RMSE not computed: {reason}"),
    }
}

fn format_model(summary: &ModelSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("- {}\n", summary.display_name()));
    out.push_str(&format!(
        "- AIC={:.3} AICc={:.3} BIC={:.3} sigma2={:.6} n={}\n",
        summary.aic, summary.aicc, summary.bic, summary.sigma2, summary.n_obs
    ));
    if summary.with_intercept {
        out.push_str(&format!("- intercept: {:.6}\n", summary.intercept));
    }
    if !summary.ar.is_empty() {
        out.push_str(&format!("- ar: {}\n", fmt_vec(&summary.ar)));
    }
    if !summary.ma.is_empty() {
        out.push_str(&format!("- ma: {}\n", fmt_vec(&summary.ma)));
    }
    out
}

/// Every candidate the search attempted (`*` marks the chosen one).
pub fn format_candidates(trace: &SearchTrace, chosen: &ModelSummary) -> String {
    let mut out = String::new();
    let strategy = trace
        .strategy
        .map(|s| format!("{s:?}").to_lowercase())
        .unwrap_or_else(|| "fixed".to_string());
    out.push_str(&format!(
        "Search diagnostics (d={}, {}, {strategy}, {} candidates):\n",
        trace.d,
        trace.criterion.display_name(),
        trace.candidates.len()
    ));

    for c in &trace.candidates {
        let name = c.spec.to_string();
        match &c.status {
            CandidateStatus::Fitted(ic) => {
                let mark = if c.spec.order == chosen.order && c.spec.with_intercept == chosen.with_intercept {
                    "*"
                } else {
                    " "
                };
                out.push_str(&format!(
                    "{mark} {:<NAME_WIDTH$} {}={ic:.3}\n",
                    truncate(&name, NAME_WIDTH),
                    trace.criterion.display_name()
                ));
            }
            CandidateStatus::Skipped(reason) => {
                out.push_str(&format!("  (skipped {name}) {reason}\n"));
            }
        }
    }
    out
}

/// Price table; long series show the first and last `rows / 2` rows.
pub fn format_price_table(series: &PriceSeries, rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>12}\n", "date", "adj_close"));
    out.push_str(&format!("{:-<10} {:-<12}\n", "", ""));

    let points = series.points();
    let line = |p: &crate::domain::PricePoint| format!("{:<10} {:>12.4}\n", p.date, p.price);

    if rows == 0 || points.len() <= rows {
        for p in points {
            out.push_str(&line(p));
        }
        return out;
    }

    let head = rows.div_ceil(2);
    let tail = rows - head;
    for p in &points[..head] {
        out.push_str(&line(p));
    }
    out.push_str(&format!("... ({} rows omitted)\n", points.len() - head - tail));
    for p in &points[points.len() - tail..] {
        out.push_str(&line(p));
    }
    out
}

pub fn format_forecast_table(forecast: &ForecastSeries) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>12}\n", "date", "prediction"));
    out.push_str(&format!("{:-<10} {:-<12}\n", "", ""));
    for p in &forecast.points {
        out.push_str(&format!("{:<10} {:>12.4}\n", p.date, p.prediction));
    }
    out
}

pub fn format_errors(errors: &[PipelineError]) -> String {
    errors.iter().map(|e| format!("Error: {e}\n")).collect()
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
