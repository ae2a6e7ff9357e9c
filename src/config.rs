use crate::domain::CurrencyCode;
use crate::engine::{CostingPolicy, Rounding, RoundingMode};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub reference_currency: CurrencyCode,
    pub rounding_mode: RoundingMode,
    pub rounding_scale: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let reference_currency = env_map
            .get("REFERENCE_CURRENCY")
            .map(|s| s.trim())
            .unwrap_or("USD");
        if reference_currency.is_empty() {
            return Err(ConfigError::InvalidValue(
                "REFERENCE_CURRENCY".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let reference_currency = CurrencyCode::new(reference_currency);

        let rounding_mode = env_map
            .get("COST_ROUNDING")
            .map(|s| s.as_str())
            .unwrap_or("none")
            .parse::<RoundingMode>()
            .map_err(|e| ConfigError::InvalidValue("COST_ROUNDING".to_string(), e))?;

        let rounding_scale = env_map
            .get("COST_ROUNDING_SCALE")
            .map(|s| s.as_str())
            .unwrap_or("2")
            .parse::<u32>()
            .ok()
            .filter(|scale| *scale <= 28)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "COST_ROUNDING_SCALE".to_string(),
                    "must be an integer between 0 and 28".to_string(),
                )
            })?;

        Ok(Config {
            database_path,
            reference_currency,
            rounding_mode,
            rounding_scale,
        })
    }

    /// Policy every computation run of this process is evaluated under.
    pub fn costing_policy(&self) -> CostingPolicy {
        CostingPolicy {
            rounding: Rounding::new(self.rounding_mode, self.rounding_scale),
            reference_currency: self.reference_currency.clone(),
        }
    }
}
