use crate::core::retry::RetryPolicy;
use crate::core::venue::VenueClass;
use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MorningstarProviderConfig {
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for MorningstarProviderConfig {
    fn default() -> Self {
        MorningstarProviderConfig {
            base_url: "https://www.morningstar.cn/cn-api/v2/funds".to_string(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub morningstar: Option<MorningstarProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            morningstar: Some(MorningstarProviderConfig::default()),
        }
    }
}

/// Concurrency, pacing and retry budget for a batch fetch.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of workers draining the code queue.
    pub max_concurrency: usize,
    /// Minimum gap between two requests issued by the same worker.
    pub min_interval_ms: u64,
    /// Retries per endpoint for transient failures (total attempts = 1 + retries).
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_concurrency: 10,
            min_interval_ms: 500,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl FetchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Retries wait at least the pacing interval, so a retrying worker keeps
    /// to the same request rate as one moving through the queue.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay_ms: self.initial_backoff_ms,
            max_delay_ms: self.max_backoff_ms,
            backoff_multiplier: self.backoff_multiplier,
            min_delay_ms: self.min_interval_ms,
        }
    }
}

/// Explicit fee defaults that depend on the venue class. All values in percent.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct ClassFeeDefaults {
    pub management_fee: f64,
    #[serde(default)]
    pub subscription_fee: f64,
    #[serde(default)]
    pub redemption_fee: f64,
    #[serde(default)]
    pub sales_service_fee: f64,
}

impl ClassFeeDefaults {
    const fn with_management(management_fee: f64) -> Self {
        ClassFeeDefaults {
            management_fee,
            subscription_fee: 0.0,
            redemption_fee: 0.0,
            sales_service_fee: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct VenueFeeTable {
    pub etf: ClassFeeDefaults,
    pub lof: ClassFeeDefaults,
    pub closed_end: ClassFeeDefaults,
    pub off_exchange: ClassFeeDefaults,
}

impl Default for VenueFeeTable {
    fn default() -> Self {
        VenueFeeTable {
            etf: ClassFeeDefaults::with_management(0.15),
            lof: ClassFeeDefaults::with_management(0.50),
            closed_end: ClassFeeDefaults::with_management(0.80),
            off_exchange: ClassFeeDefaults::with_management(1.20),
        }
    }
}

/// Fallback values the estimator uses when the fee schedule is missing fields.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeeDefaults {
    /// Custodian fee is the same for every venue class.
    pub custodian_fee: f64,
    pub transaction_cost: f64,
    pub other_fees: f64,
    pub classes: VenueFeeTable,
}

impl Default for FeeDefaults {
    fn default() -> Self {
        FeeDefaults {
            custodian_fee: 0.05,
            transaction_cost: 0.0,
            other_fees: 0.0,
            classes: VenueFeeTable::default(),
        }
    }
}

impl FeeDefaults {
    pub fn for_class(&self, class: VenueClass) -> &ClassFeeDefaults {
        match class {
            VenueClass::Etf => &self.classes.etf,
            VenueClass::Lof => &self.classes.lof,
            VenueClass::ClosedEnd => &self.classes.closed_end,
            VenueClass::OffExchange => &self.classes.off_exchange,
        }
    }
}

/// Maximum points per scoring dimension.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DimensionWeights {
    pub fees: f64,
    pub scale: f64,
    pub short_term: f64,
    pub long_term: f64,
    pub excess_return: f64,
    pub stability: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        DimensionWeights {
            fees: 15.0,
            scale: 15.0,
            short_term: 20.0,
            long_term: 25.0,
            excess_return: 10.0,
            stability: 15.0,
        }
    }
}

impl DimensionWeights {
    pub fn total(&self) -> f64 {
        self.fees + self.scale + self.short_term + self.long_term + self.excess_return + self.stability
    }
}

/// A percentile band. Percentiles at or above `lower` (and below the next band's
/// lower bound) earn a fraction of the weight interpolated from `floor` to `ceiling`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PercentileBand {
    pub lower: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl PercentileBand {
    pub const fn fixed(lower: f64, fraction: f64) -> Self {
        PercentileBand {
            lower,
            floor: fraction,
            ceiling: fraction,
        }
    }
}

/// Fund size range considered healthy, in currency units.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct ScaleBand {
    pub min: f64,
    pub max: f64,
}

impl ScaleBand {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: DimensionWeights,
    /// Ordered from the highest lower bound to the lowest; the last band must start at 0.
    pub bands: Vec<PercentileBand>,
    /// Fraction of the weight given when an entity has no value for a dimension.
    pub missing_fraction: f64,
    /// Highest fraction of the long-term weight reachable through the three-year fallback.
    pub fallback_cap: f64,
    pub ideal_scale: ScaleBand,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            weights: DimensionWeights::default(),
            bands: vec![
                PercentileBand {
                    lower: 0.9,
                    floor: 0.9,
                    ceiling: 1.0,
                },
                PercentileBand::fixed(0.7, 0.75),
                PercentileBand::fixed(0.3, 0.55),
                PercentileBand::fixed(0.0, 0.25),
            ],
            missing_fraction: 0.5,
            fallback_cap: 0.8,
            ideal_scale: ScaleBand {
                min: 2.0e8,
                max: 5.0e9,
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub fee_defaults: FeeDefaults,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fundsift", "fundsift")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fetch = &self.fetch;
        ensure!(fetch.max_concurrency > 0, "fetch.max_concurrency must be at least 1");
        ensure!(
            fetch.backoff_multiplier >= 1.0,
            "fetch.backoff_multiplier must be >= 1.0"
        );
        ensure!(
            fetch.initial_backoff_ms <= fetch.max_backoff_ms,
            "fetch.initial_backoff_ms must not exceed fetch.max_backoff_ms"
        );

        let scoring = &self.scoring;
        ensure!(!scoring.bands.is_empty(), "scoring.bands must not be empty");
        for pair in scoring.bands.windows(2) {
            ensure!(
                pair[0].lower > pair[1].lower,
                "scoring.bands must be ordered by strictly decreasing lower bound"
            );
        }
        ensure!(
            scoring.bands.last().is_some_and(|band| band.lower == 0.0),
            "the last scoring band must start at percentile 0"
        );
        for band in &scoring.bands {
            ensure!(
                (0.0..=1.0).contains(&band.lower)
                    && (0.0..=1.0).contains(&band.floor)
                    && (0.0..=1.0).contains(&band.ceiling)
                    && band.floor <= band.ceiling,
                "scoring band {band:?} must use values in [0, 1] with floor <= ceiling"
            );
        }
        ensure!(
            (0.0..=1.0).contains(&scoring.missing_fraction),
            "scoring.missing_fraction must be in [0, 1]"
        );
        ensure!(
            (0.0..1.0).contains(&scoring.fallback_cap),
            "scoring.fallback_cap must be in [0, 1)"
        );
        ensure!(
            scoring.ideal_scale.min <= scoring.ideal_scale.max,
            "scoring.ideal_scale.min must not exceed scoring.ideal_scale.max"
        );
        let weights = &scoring.weights;
        ensure!(
            [
                weights.fees,
                weights.scale,
                weights.short_term,
                weights.long_term,
                weights.excess_return,
                weights.stability
            ]
            .iter()
            .all(|w| *w >= 0.0),
            "scoring.weights must be non-negative"
        );
        Ok(())
    }
}
