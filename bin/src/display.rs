//! Shared argument parsing and terminal output for the eodsync CLI.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use eodsync_run::{DataDir, RunConfig, RunProgress};
use eodsync_types::{FetchWindow, Instrument, MarketCap, RunMode};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Window end policy accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ModeArg {
    /// Window ends today
    Daily,
    /// Window ends yesterday
    Bulk,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Daily => Self::Daily,
            ModeArg::Bulk => Self::Bulk,
        }
    }
}

/// Opens the data directory from `--data-dir` or the default location.
pub(crate) fn open_data_dir(path: Option<&Path>) -> Result<DataDir> {
    match path {
        Some(path) => DataDir::new(path)
            .with_context(|| format!("Failed to open data directory {}", path.display())),
        None => DataDir::with_default_path().context("Failed to open default data directory"),
    }
}

/// Loads `config.json` from the data directory, or the defaults.
pub(crate) fn load_config(data: &DataDir) -> Result<RunConfig> {
    RunConfig::load(&data.config_path()).context("Failed to load run configuration")
}

/// Parses a `YYYY-MM-DD` argument.
pub(crate) fn parse_date(value: &str, label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {label} date: {value}"))
}

/// Parses a market-cap bucket argument.
pub(crate) fn parse_cap(value: &str) -> Result<MarketCap> {
    value
        .parse()
        .with_context(|| format!("Valid buckets: {}", bucket_names()))
}

fn bucket_names() -> String {
    MarketCap::all()
        .iter()
        .map(MarketCap::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Progress bar over a run's fetch loop.
pub(crate) struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub(crate) fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} instruments {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunProgress for BarProgress {
    fn batch_selected(&mut self, window: &FetchWindow, batch: &[Instrument]) {
        self.bar.set_length(batch.len() as u64);
        self.bar.set_message(window.to_string());
    }

    fn instrument_done(&mut self, instrument: &Instrument, succeeded: bool) {
        if !succeeded {
            self.bar
                .println(format!("  {} failed", instrument.symbol()));
        }
        self.bar.inc(1);
    }
}
