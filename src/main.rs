mod app;
mod config;
mod data;
mod error;
mod pipeline;
mod processing;
mod render;
mod state;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use app::ReportApp;
use config::ReportConfig;
use processing::window::WindowAlignment;
use state::theme::Theme;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Weekly glucose report from a CGM/meter export",
    long_about = None
)]
struct Cli {
    /// Input CSV/XLSX file (defaults to the first *.csv in --input-dir)
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Directory scanned for an input file when none is given
    #[arg(long, value_hint = ValueHint::DirPath)]
    input_dir: Option<PathBuf>,

    /// Directory the PNG report is written to
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Window length in days
    #[arg(long)]
    days: Option<u32>,

    /// Window alignment policy
    #[arg(long, value_enum)]
    align: Option<AlignOpt>,

    /// Chart theme
    #[arg(long, value_enum)]
    theme: Option<ThemeOpt>,

    /// Write the computed statistics as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    summary_json: Option<PathBuf>,

    /// Write the hourly series as CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    hourly_csv: Option<PathBuf>,

    /// Compute statistics without drawing the PNG
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AlignOpt {
    /// Whole days, midnight to midnight
    Calendar,
    /// Exact trailing duration from the latest reading
    Trailing,
}

impl From<AlignOpt> for WindowAlignment {
    fn from(value: AlignOpt) -> Self {
        match value {
            AlignOpt::Calendar => WindowAlignment::CalendarAligned,
            AlignOpt::Trailing => WindowAlignment::RawTrailing,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ThemeOpt {
    Light,
    Dark,
}

impl From<ThemeOpt> for Theme {
    fn from(value: ThemeOpt) -> Self {
        match value {
            ThemeOpt::Light => Theme::Light,
            ThemeOpt::Dark => Theme::Dark,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<ReportConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReportConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ReportConfig::default(),
        };

        if let Some(input) = self.input {
            cfg.input = Some(input);
        }
        if let Some(dir) = self.input_dir {
            cfg.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(days) = self.days {
            cfg.analysis.window_days = days;
        }
        if let Some(align) = self.align {
            cfg.analysis.alignment = align.into();
        }
        if let Some(theme) = self.theme {
            cfg.style.theme = theme.into();
        }
        if self.summary_json.is_some() {
            cfg.summary_json = self.summary_json;
        }
        if self.hourly_csv.is_some() {
            cfg.hourly_csv = self.hourly_csv;
        }
        if self.no_plot {
            cfg.render = false;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(report_err) = err.downcast_ref::<error::ReportError>() {
                if report_err.is_non_fatal() {
                    warn!("{report_err}");
                    return ExitCode::SUCCESS;
                }
            }
            error!("An error occurred during analysis: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = cli.into_config()?;
    let app = ReportApp::new(cfg)?;
    let outcome = app.run()?;
    info!(
        input = %outcome.input.display(),
        days = outcome.report.daily_stats.len(),
        weekly_average = outcome.report.weekly_average,
        "done"
    );
    Ok(())
}
