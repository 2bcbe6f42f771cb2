//! Fee pool configuration
//!
//! Ratios are 18-decimal fixed-point stored as `u64` so they round-trip
//! through TOML integers (`0.2` is `200000000000000000`).

use feepool_core::{AccountId, CurrencyKey, FeePoolError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants::*;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for FeePoolError {
    fn from(err: ConfigError) -> Self {
        FeePoolError::Config(err.to_string())
    }
}

/// Complete fee pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeePoolConfig {
    /// Slots in the rolling window
    #[serde(default = "default_fee_period_length")]
    pub fee_period_length: usize,

    /// Seconds a period stays open; zero leaves the primary close disabled
    #[serde(default = "default_fee_period_duration")]
    pub fee_period_duration: u64,

    /// Account allowed to import history and change settings
    #[serde(default)]
    pub owner: Option<AccountId>,

    /// Account allowed to mirror closes from a counterpart deployment
    #[serde(default)]
    pub relayer: Option<AccountId>,

    /// Claim gate parameters
    #[serde(default)]
    pub gate: GateConfig,

    /// Events held until drained; the oldest are dropped beyond this
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for FeePoolConfig {
    fn default() -> Self {
        Self {
            fee_period_length: default_fee_period_length(),
            fee_period_duration: default_fee_period_duration(),
            owner: None,
            relayer: None,
            gate: GateConfig::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Claim gate parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Target debt-to-collateral ratio
    #[serde(default = "default_issuance_ratio")]
    pub issuance_ratio: u64,

    /// Buffer above the issuance ratio before claims are blocked
    #[serde(default = "default_target_threshold")]
    pub target_threshold: u64,

    /// Maximum age in seconds of a rate used to value a claim
    #[serde(default = "default_rate_stale_period")]
    pub rate_stale_period: u64,

    /// Rates that must be fresh for claims and closes
    #[serde(default = "default_required_rates")]
    pub required_rates: Vec<CurrencyKey>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            issuance_ratio: default_issuance_ratio(),
            target_threshold: default_target_threshold(),
            rate_stale_period: default_rate_stale_period(),
            required_rates: default_required_rates(),
        }
    }
}

fn default_fee_period_length() -> usize {
    FEE_PERIOD_LENGTH
}

fn default_fee_period_duration() -> u64 {
    DEFAULT_FEE_PERIOD_DURATION
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_issuance_ratio() -> u64 {
    DEFAULT_ISSUANCE_RATIO
}

fn default_target_threshold() -> u64 {
    DEFAULT_TARGET_THRESHOLD
}

fn default_rate_stale_period() -> u64 {
    DEFAULT_RATE_STALE_PERIOD
}

fn default_required_rates() -> Vec<CurrencyKey> {
    vec![CurrencyKey::new(COLLATERAL_CURRENCY)]
}

impl FeePoolConfig {
    /// Parse and validate TOML
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_FEE_PERIOD_LENGTH).contains(&self.fee_period_length) {
            return Err(ConfigError::Invalid(format!(
                "fee_period_length must be between 2 and {}, got {}",
                MAX_FEE_PERIOD_LENGTH, self.fee_period_length
            )));
        }
        // zero is allowed and reported as DurationNotConfigured at close time
        if self.fee_period_duration != 0 {
            validate_fee_period_duration(self.fee_period_duration)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if self.gate.issuance_ratio == 0 {
            return Err(ConfigError::Invalid("issuance_ratio must be non-zero".into()));
        }
        validate_rate_stale_period(self.gate.rate_stale_period)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be non-zero".into()));
        }
        Ok(())
    }
}

/// Bounds shared by configuration and the owner setter
pub fn validate_fee_period_duration(secs: u64) -> feepool_core::Result<()> {
    if !(MIN_FEE_PERIOD_DURATION..=MAX_FEE_PERIOD_DURATION).contains(&secs) {
        return Err(FeePoolError::InvalidInput(format!(
            "fee period duration {}s outside [{}, {}]",
            secs, MIN_FEE_PERIOD_DURATION, MAX_FEE_PERIOD_DURATION
        )));
    }
    Ok(())
}

pub fn validate_rate_stale_period(secs: u64) -> feepool_core::Result<()> {
    if !(1..=MAX_RATE_STALE_PERIOD).contains(&secs) {
        return Err(FeePoolError::InvalidInput(format!(
            "rate stale period {}s outside [1, {}]",
            secs, MAX_RATE_STALE_PERIOD
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeePoolConfig::default();
        assert_eq!(config.fee_period_length, 6);
        assert_eq!(config.fee_period_duration, 7 * 24 * 3600);
        assert!(config.validate().is_ok());
        assert_eq!(config.gate.required_rates, vec![CurrencyKey::new("SNX")]);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            fee_period_length = 4
            fee_period_duration = 86400
            relayer = "0202020202020202020202020202020202020202020202020202020202020202"

            [gate]
            issuance_ratio = 250000000000000000
            required_rates = ["SNX", "sUSD"]
        "#;
        let config = FeePoolConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.fee_period_length, 4);
        assert_eq!(config.relayer, Some(AccountId::new([2u8; 32])));
        assert_eq!(config.gate.issuance_ratio, 250_000_000_000_000_000);
        assert_eq!(config.gate.target_threshold, DEFAULT_TARGET_THRESHOLD);
        assert_eq!(config.gate.required_rates.len(), 2);
        assert!(config.owner.is_none());
    }

    #[test]
    fn test_zero_duration_is_accepted() {
        let config = FeePoolConfig::from_toml_str("fee_period_duration = 0").unwrap();
        assert_eq!(config.fee_period_duration, 0);
    }

    #[test]
    fn test_invalid_length_rejected() {
        let err = FeePoolConfig::from_toml_str("fee_period_length = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duration_out_of_bounds_rejected() {
        assert!(FeePoolConfig::from_toml_str("fee_period_duration = 60").is_err());
    }

    #[test]
    fn test_stale_period_bounds() {
        assert!(FeePoolConfig::from_toml_str("[gate]\nrate_stale_period = 0").is_err());
        let err = FeePoolConfig::from_toml_str(&format!(
            "[gate]\nrate_stale_period = {}",
            MAX_RATE_STALE_PERIOD + 1
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = FeePoolConfig::from_toml_str(&format!(
            "[gate]\nrate_stale_period = {}",
            MAX_RATE_STALE_PERIOD
        ))
        .unwrap();
        assert_eq!(config.gate.rate_stale_period, MAX_RATE_STALE_PERIOD);
    }

    #[test]
    fn test_event_buffer() {
        assert_eq!(FeePoolConfig::default().event_buffer, DEFAULT_EVENT_BUFFER);
        let config = FeePoolConfig::from_toml_str("event_buffer = 16").unwrap();
        assert_eq!(config.event_buffer, 16);
        assert!(FeePoolConfig::from_toml_str("event_buffer = 0").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = FeePoolConfig::from_toml_str("fee_period_length = \"six\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fee_period_length = 8").unwrap();
        writeln!(file, "[gate]").unwrap();
        writeln!(file, "rate_stale_period = 3600").unwrap();

        let config = FeePoolConfig::load(file.path()).unwrap();
        assert_eq!(config.fee_period_length, 8);
        assert_eq!(config.gate.rate_stale_period, 3600);
    }

    #[test]
    fn test_missing_file() {
        let err = FeePoolConfig::load("/nonexistent/feepool.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
