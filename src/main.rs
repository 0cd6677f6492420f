use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundsift::core::log::init_logging;
use fundsift::{AppCommand, FetchOverrides, RankArgs};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch funds and rank them against each other
    Rank {
        /// Fund codes to rank
        codes: Vec<String>,

        /// YAML or JSON file with `{code, name}` entries or a `{code: name}` mapping
        #[arg(short, long)]
        listing: Option<PathBuf>,

        /// Name of the cohort, e.g. the sector
        #[arg(long, default_value = "funds")]
        cohort: String,

        /// Show only the best N funds
        #[arg(short, long)]
        top: Option<usize>,

        /// Stop starting new funds after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Write the scorable funds as JSON for the AI ranking step
        #[arg(long)]
        export: Option<PathBuf>,

        /// Show a ranking returned by the AI ranking step
        #[arg(long)]
        oracle_response: Option<PathBuf>,

        /// Override fetch.max_concurrency
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Override fetch.min_interval_ms
        #[arg(long)]
        min_interval_ms: Option<u64>,

        /// Override fetch.max_retries
        #[arg(long)]
        max_retries: Option<u32>,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Setup => AppCommand::Setup,
            Commands::Rank {
                codes,
                listing,
                cohort,
                top,
                deadline_secs,
                export,
                oracle_response,
                max_concurrency,
                min_interval_ms,
                max_retries,
            } => AppCommand::Rank {
                args: RankArgs {
                    codes,
                    listing,
                    cohort,
                    top,
                    deadline: deadline_secs.map(Duration::from_secs),
                    export,
                    oracle_response,
                },
                overrides: FetchOverrides {
                    max_concurrency,
                    min_interval_ms,
                    max_retries,
                },
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => fundsift::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
