//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - builds the price source and model selector from flags
//! - runs the forecast pipeline
//! - prints reports/plots and writes optional exports

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::warn;

use crate::cli::{Cli, Command, ForecastArgs, PlotArgs, SearchArgs, SourceArgs, TuiArgs};
use crate::data::{CsvPriceSource, PriceSource, SyntheticConfig, SyntheticSource, YahooClient};
use crate::domain::{ForecastRequest, SearchConfig};
use crate::error::{AppError, PipelineError, ValidationError, EXIT_INPUT};
use crate::logging::LogTarget;
use crate::plot::ChartData;

pub mod pipeline;

use pipeline::{run_forecast, ForecastResponse};

/// Entry point for the `pf` binary.
pub fn run() -> Result<(), AppError> {
    // `pf` and `pf --ticker MSFT` behave like `pf tui ...`.
    //
    // Clap requires a subcommand name, so we rewrite argv before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    // The TUI owns the terminal: it only logs when asked to write a file.
    let log_target = match (&cli.log_file, &cli.command) {
        (Some(path), _) => LogTarget::File(path.clone()),
        (None, Command::Tui(_)) => LogTarget::Off,
        (None, _) => LogTarget::Stderr,
    };
    crate::logging::init(cli.verbose, log_target)?;

    let today = Local::now().date_naive();
    match cli.command {
        Command::Forecast(args) => handle_forecast(args, today),
        Command::Tui(args) => handle_tui(args, today),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Terminal output and export settings of `pf forecast`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub rows: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub show_candidates: bool,
    pub export_forecast: Option<PathBuf>,
    pub export_run: Option<PathBuf>,
    pub export_svg: Option<PathBuf>,
    pub debug_bundle: bool,
}

pub fn search_config_from_args(args: &SearchArgs) -> SearchConfig {
    SearchConfig {
        strategy: args.strategy,
        criterion: args.ic,
        max_p: args.max_p,
        max_q: args.max_q,
        max_d: args.max_d,
        max_order: args.max_order,
        max_fits: args.max_fits,
        seed: args.seed,
        fixed_order: args.order,
        ..SearchConfig::default()
    }
}

pub fn output_config_from_args(args: &ForecastArgs) -> OutputConfig {
    OutputConfig {
        rows: args.rows,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        show_candidates: args.candidates,
        export_forecast: args.export_forecast.clone(),
        export_run: args.export_run.clone(),
        export_svg: args.export_svg.clone(),
        debug_bundle: args.debug_bundle,
    }
}

pub fn request_from_args(args: &ForecastArgs, today: NaiveDate) -> ForecastRequest {
    ForecastRequest {
        ticker: args.ticker.clone(),
        date_range: args.start.zip(args.end),
        horizon: args.horizon,
        test_percentage: args.test_pct,
        today,
    }
}

/// Yahoo Finance unless `--csv` or `--demo` is given.
pub fn make_source(args: &SourceArgs, seed: u64, today: NaiveDate) -> Result<Box<dyn PriceSource>, AppError> {
    if let Some(path) = &args.csv {
        return Ok(Box::new(CsvPriceSource::new(path)));
    }
    if args.demo {
        let config = SyntheticConfig {
            seed,
            ..SyntheticConfig::new(today)
        };
        return Ok(Box::new(SyntheticSource::new(config)?));
    }
    Ok(Box::new(YahooClient::from_env()?))
}

fn handle_forecast(args: ForecastArgs, today: NaiveDate) -> Result<(), AppError> {
    // The pipeline skips an empty ticker silently; on the command line it is a usage error.
    if args.ticker.trim().is_empty() {
        return Err(AppError::new(EXIT_INPUT, ValidationError::EmptyTicker.to_string()));
    }

    let config = search_config_from_args(&args.search);
    let output = output_config_from_args(&args);
    let request = request_from_args(&args, today);

    let source = make_source(&args.source, config.seed, today)?;
    let selector = crate::fit::selector_from_config(&config);

    let response = run_forecast(&request, source.as_ref(), selector.as_ref()).map_err(PipelineError::from)?;

    print!("{}", render_forecast_output(&response, &output, source.name(), &selector.describe()));

    if output.debug_bundle {
        let path = crate::debug::write_debug_bundle(Path::new("debug"), &response, source.name(), &selector.describe())?;
        eprintln!("Wrote debug bundle: {}", path.display());
    }
    write_exports(&response, &request, &output)?;

    match response.errors.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Everything `pf forecast` prints to stdout.
pub fn render_forecast_output(
    response: &ForecastResponse,
    output: &OutputConfig,
    source_name: &str,
    selector: &str,
) -> String {
    let mut out = crate::report::format_run_summary(response, source_name, selector);

    if !response.series.is_empty() {
        out.push_str("Prices:\n");
        out.push_str(&crate::report::format_price_table(&response.series, output.rows));
        out.push('\n');
        if output.plot {
            out.push_str(&crate::plot::render_forecast_plot(
                &response.series,
                None,
                output.plot_width,
                output.plot_height,
            ));
            out.push('\n');
        }
    }

    if output.show_candidates {
        for model in response.evaluation_model.iter().chain(response.model.iter()) {
            out.push_str(&crate::report::format_candidates(&model.trace, &model.summary()));
            out.push('\n');
        }
    }

    if let Some(forecast) = &response.forecast {
        out.push_str("Forecast:\n");
        out.push_str(&crate::report::format_forecast_table(forecast));
        out.push('\n');
    }

    if output.plot && !response.series.is_empty() {
        out.push_str(&crate::plot::render_forecast_plot(
            &response.series,
            response.forecast.as_ref(),
            output.plot_width,
            output.plot_height,
        ));
    }
    out
}

fn write_exports(response: &ForecastResponse, request: &ForecastRequest, output: &OutputConfig) -> Result<(), AppError> {
    let wants_export = output.export_forecast.is_some() || output.export_run.is_some() || output.export_svg.is_some();
    let Some(forecast) = &response.forecast else {
        if wants_export {
            warn!("no forecast was produced; skipping exports");
        }
        return Ok(());
    };

    if let Some(path) = &output.export_forecast {
        crate::io::write_forecast_csv(path, forecast)?;
    }
    if let Some(path) = &output.export_run {
        if let Some(run) = response.to_forecast_file(request, Local::now().to_rfc3339()) {
            crate::io::write_run_json(path, &run)?;
        }
    }
    if let Some(path) = &output.export_svg {
        if let Some(data) = ChartData::new(&response.series, Some(forecast)) {
            let title = format!("{} adjusted close and forecast", response.ticker);
            crate::plot::write_svg_chart(path, &data, &title)?;
        }
    }
    Ok(())
}

fn handle_tui(args: TuiArgs, today: NaiveDate) -> Result<(), AppError> {
    let config = search_config_from_args(&args.search);
    let source = make_source(&args.source, config.seed, today)?;
    let selector = crate::fit::selector_from_config(&config);

    let mut form = crate::tui::FormState::new(today);
    form.ticker = args.ticker.trim().to_uppercase();
    if let (Some(start), Some(end)) = (args.start, args.end) {
        form.custom_range = true;
        form.start = start.to_string();
        form.end = end.to_string();
    }
    form.horizon = args.horizon;
    form.test_percentage = args.test_pct;

    crate::tui::run(form, source, selector, today)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let run = crate::io::read_run_json(&args.run)?;

    println!("Run: {} ({}, generated {})", run.ticker, run.tool, run.generated);
    println!("Model: {}", run.model.display_name());
    println!("{}", crate::report::format_evaluation(&run.evaluation));
    print!(
        "{}",
        crate::plot::render_forecast_plot(&run.series, Some(&run.forecast), args.width, args.height)
    );

    if let Some(path) = &args.export_svg {
        if let Some(data) = ChartData::new(&run.series, Some(&run.forecast)) {
            let title = format!("{} adjusted close and forecast", run.ticker);
            crate::plot::write_svg_chart(path, &data, &title)?;
        }
    }
    Ok(())
}

/// Rewrite argv so `pf` defaults to `pf tui`.
///
/// Rules (global `-v` / `--log-file PATH` flags are skipped first):
/// - `pf`                          -> `pf tui`
/// - `pf --ticker MSFT ...`        -> `pf tui --ticker MSFT ...`
/// - `pf --help/--version/-h`      -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let mut idx = 1;
    while let Some(arg) = argv.get(idx) {
        let is_verbose = arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'));
        if is_verbose {
            idx += 1;
        } else if arg == "--log-file" {
            idx += 2;
        } else if arg.starts_with("--log-file=") {
            idx += 1;
        } else {
            break;
        }
    }

    let Some(first) = argv.get(idx) else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(first.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    let is_subcommand = matches!(first.as_str(), "forecast" | "tui" | "plot");
    if is_top_level_help_or_version || is_subcommand {
        return argv;
    }

    // A flag in first position is treated as a TUI flag.
    if first.starts_with('-') {
        argv.insert(idx, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InformationCriterion, SearchStrategy};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocations_default_to_tui() {
        assert_eq!(rewrite_args(argv(&["pf"])), argv(&["pf", "tui"]));
        assert_eq!(rewrite_args(argv(&["pf", "-vv"])), argv(&["pf", "-vv", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["pf", "--ticker", "MSFT"])),
            argv(&["pf", "tui", "--ticker", "MSFT"])
        );
        assert_eq!(
            rewrite_args(argv(&["pf", "--log-file", "pf.log", "--demo"])),
            argv(&["pf", "--log-file", "pf.log", "tui", "--demo"])
        );
    }

    #[test]
    fn subcommands_and_help_are_unchanged() {
        for args in [
            argv(&["pf", "forecast", "MSFT"]),
            argv(&["pf", "-v", "plot", "--run", "r.json"]),
            argv(&["pf", "--help"]),
            argv(&["pf", "-V"]),
        ] {
            assert_eq!(rewrite_args(args.clone()), args);
        }
    }

    fn forecast_args(extra: &[&str]) -> ForecastArgs {
        let mut args = vec!["pf", "forecast"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Command::Forecast(args) => args,
            _ => panic!("expected forecast"),
        }
    }

    #[test]
    fn flags_become_config() {
        let args = forecast_args(&[
            "msft", "--start", "2024-01-01", "--end", "2024-03-01", "--horizon", "7", "--strategy", "random",
            "--ic", "aicc", "--max-fits", "12", "--no-plot", "--export-run", "run.json",
        ]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let config = search_config_from_args(&args.search);
        assert_eq!(config.strategy, SearchStrategy::Random);
        assert_eq!(config.criterion, InformationCriterion::Aicc);
        assert_eq!(config.max_fits, 12);
        assert_eq!(config.alpha, SearchConfig::default().alpha);

        let request = request_from_args(&args, today);
        assert_eq!(request.horizon, 7);
        assert_eq!(
            request.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
            ))
        );

        let output = output_config_from_args(&args);
        assert!(!output.plot);
        assert_eq!(output.export_run, Some(PathBuf::from("run.json")));
    }

    #[test]
    fn demo_forecast_output_has_every_section() {
        let args = forecast_args(&["demo", "--demo", "--horizon", "3", "--max-p", "1", "--max-q", "1", "--candidates"]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let config = search_config_from_args(&args.search);
        let source = make_source(&args.source, config.seed, today).unwrap();
        let selector = crate::fit::selector_from_config(&config);

        let response = run_forecast(&request_from_args(&args, today), source.as_ref(), selector.as_ref()).unwrap();
        assert!(response.is_ok(), "{:?}", response.errors);

        let text = render_forecast_output(&response, &output_config_from_args(&args), source.name(), "auto");
        for section in ["Ticker: DEMO", "Prices:", "Search diagnostics", "Forecast:", "Plot: date="] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("2024-06-17"));

        // The history chart comes before the forecast table, the combined one after it.
        let headers: Vec<usize> = text.match_indices("Plot: date=").map(|(i, _)| i).collect();
        assert_eq!(headers.len(), 2);
        let forecast_at = text.find("Forecast:").unwrap();
        assert!(headers[0] < forecast_at && forecast_at < headers[1]);
        assert!(text[headers[0]..].lines().next().unwrap().ends_with("| - actual"));
        assert!(text[headers[1]..].lines().next().unwrap().ends_with("* forecast"));
    }

    #[test]
    fn default_search_flags_match_search_config() {
        let args = forecast_args(&["msft"]);
        assert_eq!(search_config_from_args(&args.search), SearchConfig::default());
    }

    #[test]
    fn exports_write_files() {
        let args = forecast_args(&["demo", "--demo", "--horizon", "2", "--max-p", "1", "--max-q", "1"]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let source = make_source(&args.source, 42, today).unwrap();
        let selector = crate::fit::selector_from_config(&search_config_from_args(&args.search));
        let request = request_from_args(&args, today);
        let response = run_forecast(&request, source.as_ref(), selector.as_ref()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            export_forecast: Some(dir.path().join("f.csv")),
            export_run: Some(dir.path().join("run.json")),
            export_svg: Some(dir.path().join("chart.svg")),
            ..output_config_from_args(&args)
        };
        write_exports(&response, &request, &output).unwrap();

        let csv = std::fs::read_to_string(dir.path().join("f.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let run = crate::io::read_run_json(&dir.path().join("run.json")).unwrap();
        assert_eq!(run.forecast.len(), 2);
        assert!(dir.path().join("chart.svg").exists());
    }
}
