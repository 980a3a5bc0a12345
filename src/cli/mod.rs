//! Command-line parsing for the `pf` stock price forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! data, modeling and presentation code. `app` turns these structs into plain
//! config values.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{ArimaOrder, InformationCriterion, SearchStrategy, DEFAULT_HORIZON, DEFAULT_TEST_PERCENTAGE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pf", version, about = "AutoARIMA stock price forecaster (Yahoo Finance daily adjusted close)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `PF_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr (the TUI only logs to a file).
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch prices, evaluate, forecast and print tables/charts.
    Forecast(ForecastArgs),
    /// Launch the interactive TUI (the default when no subcommand is given).
    Tui(TuiArgs),
    /// Plot a run saved with `pf forecast --export-run`.
    Plot(PlotArgs),
}

/// Where prices come from (Yahoo Finance unless one of these is set).
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Read prices from a CSV export (`Date` + `Adj Close` or `Close` columns).
    #[arg(long, value_name = "CSV", conflicts_with = "demo")]
    pub csv: Option<PathBuf>,

    /// Use seeded synthetic prices (no network).
    #[arg(long)]
    pub demo: bool,
}

/// Order search options.
#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// How candidate orders are explored.
    #[arg(long, value_enum, default_value_t = SearchStrategy::Stepwise)]
    pub strategy: SearchStrategy,

    /// Information criterion used to rank candidates.
    #[arg(long, value_enum, default_value_t = InformationCriterion::Aic)]
    pub ic: InformationCriterion,

    /// Upper bound on candidate fits per search.
    #[arg(long, default_value_t = 100)]
    pub max_fits: usize,

    /// Seed for the random strategy (and the demo source).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 5)]
    pub max_p: usize,

    #[arg(long, default_value_t = 5)]
    pub max_q: usize,

    /// Largest differencing order the KPSS test may choose.
    #[arg(long, default_value_t = 2)]
    pub max_d: usize,

    /// Upper bound on p + q.
    #[arg(long, default_value_t = 5)]
    pub max_order: usize,

    /// Skip the search and fit this order (`p,d,q`).
    #[arg(long, value_name = "P,D,Q")]
    pub order: Option<ArimaOrder>,
}

/// Options for a one-shot forecast.
#[derive(Debug, Parser, Clone)]
pub struct ForecastArgs {
    /// Ticker symbol (case-insensitive).
    pub ticker: String,

    /// First date of a custom range (YYYY-MM-DD).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// End of a custom range, exclusive (YYYY-MM-DD).
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Days to forecast (1-30).
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    /// Share of the series held out for RMSE evaluation (1-100).
    #[arg(long, default_value_t = DEFAULT_TEST_PERCENTAGE)]
    pub test_pct: u32,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub search: SearchArgs,

    /// Price table rows (head and tail); 0 prints every row.
    #[arg(long, default_value_t = 10)]
    pub rows: usize,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Print every candidate the order search tried.
    #[arg(long)]
    pub candidates: bool,

    /// Export the forecast to CSV (`date,prediction`).
    #[arg(long, value_name = "CSV")]
    pub export_forecast: Option<PathBuf>,

    /// Save the run (series, forecast, model) to JSON for `pf plot`.
    #[arg(long, value_name = "JSON")]
    pub export_run: Option<PathBuf>,

    /// Export the combined chart as SVG.
    #[arg(long, value_name = "SVG")]
    pub export_svg: Option<PathBuf>,

    /// Write a Markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug_bundle: bool,
}

/// Options for the TUI. Everything here is only an initial value.
#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    /// Initial ticker.
    #[arg(long, default_value = "")]
    pub ticker: String,

    /// Initial custom range start (enables the custom range).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Initial custom range end, exclusive.
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    #[arg(long, default_value_t = DEFAULT_TEST_PERCENTAGE)]
    pub test_pct: u32,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub search: SearchArgs,
}

/// Options for plotting a saved run.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Run JSON file produced by `pf forecast --export-run`.
    #[arg(long, value_name = "JSON")]
    pub run: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Also write the chart as SVG.
    #[arg(long, value_name = "SVG")]
    pub export_svg: Option<PathBuf>,
}
