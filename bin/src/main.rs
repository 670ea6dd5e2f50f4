//! eodsync CLI - Incremental end-of-day equity price collector.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod logging;

use display::ModeArg;

#[derive(Parser)]
#[command(name = "eodsync")]
#[command(about = "Incremental end-of-day equity price collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (warnings only, no progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Data directory. Defaults to the platform data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the instrument registry from a listings CSV
    Import {
        /// Listings CSV file
        csv: PathBuf,

        /// Replace an existing registry
        #[arg(long)]
        replace: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Run one incremental update
    Update {
        /// Window end policy
        #[arg(short, long, value_enum, default_value = "daily")]
        mode: ModeArg,

        /// Maximum instruments fetched this run
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Hours after which an instrument is due again
        #[arg(long)]
        staleness_hours: Option<u32>,

        /// Pause between requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fold outstanding partial artifacts into the history table
    Consolidate {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show registry, history, and lock state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query the registry
    Tickers {
        /// Only instruments in this sector
        #[arg(short, long)]
        sector: Option<String>,

        /// Only instruments in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only instruments in this market-cap bucket (mega, large, mid, small, micro, nano)
        #[arg(long)]
        cap: Option<String>,

        /// List sectors instead of instruments
        #[arg(long)]
        sectors: bool,

        /// Look up the sector of these symbols (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["sector", "category", "cap", "sectors"])]
        symbols: Vec<String>,
    },

    /// Print stored adjusted closes
    History {
        /// Symbols to print
        #[arg(required = true)]
        symbols: Vec<String>,

        /// First date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,

        /// Last date (YYYY-MM-DD)
        #[arg(short, long)]
        end: Option<String>,

        /// Trailing months up to today
        #[arg(short, long, conflicts_with_all = ["start", "end"])]
        months: Option<u32>,
    },

    /// Delete archived artifacts older than the given age
    Purge {
        /// Age in days
        #[arg(long, default_value = "90")]
        older_than_days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    logging::init(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    let data_dir = cli.data_dir.as_deref();

    match command {
        Commands::Import { csv, replace, yes } => {
            commands::import::import(data_dir, &csv, replace, yes).await
        }
        Commands::Update {
            mode,
            batch_size,
            staleness_hours,
            delay_ms,
            json,
        } => {
            commands::update::update(
                data_dir,
                mode.into(),
                batch_size,
                staleness_hours,
                delay_ms,
                json,
                cli.quiet,
            )
            .await
        }
        Commands::Consolidate { json } => commands::consolidate::consolidate(data_dir, json),
        Commands::Status { json } => commands::status::status(data_dir, json),
        Commands::Tickers {
            sector,
            category,
            cap,
            sectors,
            symbols,
        } => commands::tickers::tickers(
            data_dir,
            sector.as_deref(),
            category.as_deref(),
            cap.as_deref(),
            sectors,
            &symbols,
        ),
        Commands::History {
            symbols,
            start,
            end,
            months,
        } => commands::history::history(
            data_dir,
            &symbols,
            start.as_deref(),
            end.as_deref(),
            months,
        ),
        Commands::Purge { older_than_days } => commands::purge::purge(data_dir, older_than_days),
    }
}
