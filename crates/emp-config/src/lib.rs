//! Engine configuration
//! Values come from the process environment, after `.env` is loaded

use emp_core::constants::{CALC_PRECISION, DEFAULT_WITHDRAWAL_PERIOD_MINUTES, DISPLAY_PRECISION};
use emp_core::{EngineSettings, RoundingPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_CALC_PRECISION: &str = "EMP_CALC_PRECISION";
pub const ENV_DISPLAY_PRECISION: &str = "EMP_DISPLAY_PRECISION";
pub const ENV_WITHDRAWAL_PERIOD_MINUTES: &str = "EMP_WITHDRAWAL_PERIOD_MINUTES";
pub const ENV_LOG: &str = "EMP_LOG";

// rust_decimal keeps at most 28 fractional digits
const MAX_PRECISION: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("{key} must be {expected}, got {value:?}")]
  Invalid {
    key: &'static str,
    value: String,
    expected: &'static str,
  },

  #[error("Display precision {display} exceeds calculation precision {calc}")]
  PrecisionOrder { display: u32, calc: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub calc_precision: u32,
  pub display_precision: u32,
  pub default_withdrawal_period_minutes: i64,
  pub log_level: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      calc_precision: CALC_PRECISION,
      display_precision: DISPLAY_PRECISION,
      default_withdrawal_period_minutes: DEFAULT_WITHDRAWAL_PERIOD_MINUTES,
      log_level: "info".to_string(),
    }
  }
}

impl EngineConfig {
  /// Load `.env` if present, then read the `EMP_*` variables
  pub fn from_env() -> Result<Self, ConfigError> {
    let _ = dotenvy::dotenv();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; unset keys keep their defaults
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(value) = lookup(ENV_CALC_PRECISION) {
      config.calc_precision = parse_precision(ENV_CALC_PRECISION, &value)?;
    }
    if let Some(value) = lookup(ENV_DISPLAY_PRECISION) {
      config.display_precision = parse_precision(ENV_DISPLAY_PRECISION, &value)?;
    }
    if let Some(value) = lookup(ENV_WITHDRAWAL_PERIOD_MINUTES) {
      config.default_withdrawal_period_minutes = value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| *minutes >= 0)
        .ok_or_else(|| ConfigError::Invalid {
          key: ENV_WITHDRAWAL_PERIOD_MINUTES,
          value: value.clone(),
          expected: "a non-negative number of minutes",
        })?;
    }
    if let Some(value) = lookup(ENV_LOG) {
      if !value.trim().is_empty() {
        config.log_level = value.trim().to_string();
      }
    }

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.display_precision > self.calc_precision {
      return Err(ConfigError::PrecisionOrder {
        display: self.display_precision,
        calc: self.calc_precision,
      });
    }
    Ok(())
  }

  pub fn engine_settings(&self) -> EngineSettings {
    EngineSettings {
      rounding: RoundingPolicy {
        calc_dp: self.calc_precision,
        display_dp: self.display_precision,
      },
      default_withdrawal_period_minutes: self.default_withdrawal_period_minutes,
    }
  }
}

fn parse_precision(key: &'static str, value: &str) -> Result<u32, ConfigError> {
  value
    .trim()
    .parse::<u32>()
    .ok()
    .filter(|dp| *dp <= MAX_PRECISION)
    .ok_or_else(|| ConfigError::Invalid {
      key,
      value: value.to_string(),
      expected: "a digit count between 0 and 28",
    })
}
