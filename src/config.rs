//! Configuration management with validation and defaults
//!
//! Loaded from TOML, overridden by `WAGERHOUSE_*` environment variables,
//! then validated as a whole before anything is started.

use crate::errors::{ConfigurationError, WagerResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    pub fairness: FairnessConfig,
    pub games: GamesConfig,
    pub coaster: CoasterConfig,
    pub payments: PaymentsConfig,
    pub logging: LoggingConfig,
}

/// Commitment rotation policy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConfig {
    /// Server seed is rotated after this many bets under it
    pub rotate_after: u64,
    pub max_client_seed_len: usize,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            rotate_after: 100,
            max_client_seed_len: 64,
        }
    }
}

/// Shared rules for the per-bet game families
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    /// Target return-to-player, e.g. 0.97
    pub rtp: f64,
    pub min_stake: u64,
    pub max_stake: u64,
    pub slots: SlotsConfig,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            rtp: 0.97,
            min_stake: 1,
            max_stake: 1_000_000,
            slots: SlotsConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsConfig {
    pub reels: usize,
    pub rows: usize,
    pub symbols: Vec<String>,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            reels: 3,
            rows: 3,
            symbols: ["cherry", "lemon", "bell", "bar", "seven", "diamond"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Continuous price engine parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoasterConfig {
    pub enabled: bool,
    pub tick_interval_ms: u64,
    pub baseline_price: f64,
    pub min_price: f64,
    /// Per-tick drift (mu)
    pub drift: f64,
    /// Per-tick volatility (sigma)
    pub volatility: f64,
    /// Time step fed into the walk, in ticks
    pub dt: f64,
    /// Weight of the previous innovation in the smoothed sample
    pub smoothing_prior_weight: f64,
    /// Fraction of profit retained by the house on cashout
    pub edge: f64,
    pub min_wager: u64,
    pub max_wager: u64,
    pub min_leverage: f64,
    pub max_leverage: f64,
    pub history_capacity: usize,
    pub event_buffer: usize,
}

impl Default for CoasterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 1000,
            baseline_price: 1000.0,
            min_price: 0.01,
            drift: 0.0,
            volatility: 0.002,
            dt: 1.0,
            smoothing_prior_weight: 0.15,
            edge: 0.05,
            min_wager: 1,
            max_wager: 1_000_000,
            min_leverage: 1.0,
            max_leverage: 500.0,
            history_capacity: 100,
            event_buffer: 1024,
        }
    }
}

/// Payment processor integration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub enabled: bool,
    /// Shared secret for webhook HMAC signatures
    pub webhook_secret: String,
    pub min_withdrawal: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_secret: String::new(),
            min_withdrawal: 100,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wagerhouse=info".to_string(),
            json: false,
        }
    }
}

impl CoasterConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> WagerResult<WagerConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => WagerConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> WagerResult<WagerConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut WagerConfig) -> WagerResult<()> {
        if let Ok(secret) = env::var("WAGERHOUSE_WEBHOOK_SECRET") {
            config.payments.webhook_secret = secret;
        }
        if let Ok(rtp) = env::var("WAGERHOUSE_RTP") {
            config.games.rtp = parse_env("WAGERHOUSE_RTP", rtp)?;
        }
        if let Ok(rotate) = env::var("WAGERHOUSE_ROTATE_AFTER") {
            config.fairness.rotate_after = parse_env("WAGERHOUSE_ROTATE_AFTER", rotate)?;
        }
        if let Ok(enabled) = env::var("WAGERHOUSE_COASTER_ENABLED") {
            config.coaster.enabled = parse_env("WAGERHOUSE_COASTER_ENABLED", enabled)?;
        }
        if let Ok(interval) = env::var("WAGERHOUSE_TICK_INTERVAL_MS") {
            config.coaster.tick_interval_ms = parse_env("WAGERHOUSE_TICK_INTERVAL_MS", interval)?;
        }
        if let Ok(filter) = env::var("WAGERHOUSE_LOG") {
            config.logging.filter = filter;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &WagerConfig) -> WagerResult<()> {
        if config.fairness.rotate_after == 0 {
            return Err(invalid("fairness.rotate_after", "0", "Must rotate after at least one bet"));
        }

        let games = &config.games;
        if !(games.rtp > 0.0 && games.rtp <= 1.0) {
            return Err(invalid("games.rtp", games.rtp, "RTP must be in (0, 1]"));
        }
        if games.min_stake == 0 || games.min_stake > games.max_stake {
            return Err(invalid(
                "games.min_stake",
                games.min_stake,
                "Stake bounds must satisfy 0 < min <= max",
            ));
        }
        if games.slots.reels < 2 || games.slots.rows == 0 {
            return Err(invalid(
                "games.slots.reels",
                games.slots.reels,
                "Slots need at least two reels and one row",
            ));
        }
        if games.slots.symbols.len() < 2 {
            return Err(invalid(
                "games.slots.symbols",
                games.slots.symbols.len(),
                "Slots need at least two symbols",
            ));
        }

        let coaster = &config.coaster;
        if coaster.tick_interval_ms == 0 {
            return Err(invalid("coaster.tick_interval_ms", 0, "Tick interval cannot be zero"));
        }
        if !(coaster.dt.is_finite() && coaster.dt > 0.0) {
            return Err(invalid("coaster.dt", coaster.dt, "Time step must be positive and finite"));
        }
        if !(coaster.volatility.is_finite() && coaster.volatility >= 0.0) {
            return Err(invalid(
                "coaster.volatility",
                coaster.volatility,
                "Volatility must be non-negative and finite",
            ));
        }
        if !coaster.drift.is_finite() {
            return Err(invalid("coaster.drift", coaster.drift, "Drift must be finite"));
        }
        if !(coaster.min_price > 0.0 && coaster.baseline_price > coaster.min_price) {
            return Err(invalid(
                "coaster.baseline_price",
                coaster.baseline_price,
                "Baseline must exceed a positive minimum price",
            ));
        }
        if !(0.0..1.0).contains(&coaster.smoothing_prior_weight) {
            return Err(invalid(
                "coaster.smoothing_prior_weight",
                coaster.smoothing_prior_weight,
                "Weight must be in [0, 1)",
            ));
        }
        if !(0.0..1.0).contains(&coaster.edge) {
            return Err(invalid("coaster.edge", coaster.edge, "Edge must be in [0, 1)"));
        }
        if coaster.min_leverage < 1.0 || coaster.min_leverage > coaster.max_leverage {
            return Err(invalid(
                "coaster.min_leverage",
                coaster.min_leverage,
                "Leverage bounds must satisfy 1 <= min <= max",
            ));
        }
        if coaster.min_wager == 0 || coaster.min_wager > coaster.max_wager {
            return Err(invalid(
                "coaster.min_wager",
                coaster.min_wager,
                "Wager bounds must satisfy 0 < min <= max",
            ));
        }
        if coaster.history_capacity == 0 || coaster.event_buffer == 0 {
            return Err(invalid(
                "coaster.history_capacity",
                coaster.history_capacity,
                "History and event buffers cannot be empty",
            ));
        }

        if config.payments.enabled && config.payments.webhook_secret.is_empty() {
            return Err(ConfigurationError::MissingRequired("payments.webhook_secret".to_string()).into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &WagerConfig, path: &str) -> WagerResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> WagerResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "Cannot parse environment override".to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::errors::WagerError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> WagerResult<()> {
    ConfigLoader::new().save(&WagerConfig::default(), path)
}
