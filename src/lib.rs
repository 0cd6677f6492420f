pub mod cli;
pub mod core;
pub mod providers;

pub use cli::rank::RankArgs;

use crate::core::config::AppConfig;
use crate::providers::MorningstarProvider;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

/// Command-line overrides for the `fetch` config section.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub max_concurrency: Option<usize>,
    pub min_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

impl FetchOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(n) = self.max_concurrency {
            config.fetch.max_concurrency = n;
        }
        if let Some(ms) = self.min_interval_ms {
            config.fetch.min_interval_ms = ms;
        }
        if let Some(n) = self.max_retries {
            config.fetch.max_retries = n;
        }
    }
}

pub enum AppCommand {
    Rank {
        args: RankArgs,
        overrides: FetchOverrides,
    },
    /// Write the example config to the config path.
    Setup,
}

pub fn load_config(config_path: Option<&str>, overrides: &FetchOverrides) -> Result<AppConfig> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    overrides.apply(&mut config);
    config.validate()?;
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Setup => cli::setup::setup(config_path.map(Path::new)),
        AppCommand::Rank { args, overrides } => {
            info!("fundsift starting...");
            let config = load_config(config_path, &overrides)?;
            let provider =
                MorningstarProvider::new(&config.providers.morningstar.clone().unwrap_or_default())?;

            let report = cli::rank::rank(&args, &config, &provider).await?;
            cli::rank::display_report(&args, &report);
            Ok(())
        }
    }
}
