//! Top-level configuration with env > file > defaults resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{PolicyConfig, PolicyMode, SamplingConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`CATDIST_*`)
/// 2. Config file (`catdist.toml` or an explicit path)
/// 3. Compiled defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatdistConfig {
    pub policy: PolicyConfig,
    pub sampling: SamplingConfig,
}

impl CatdistConfig {
    /// Bounded-capacity config with the given capacity.
    pub fn with_capacity(capacity: f64) -> Self {
        let mut config = Self::default();
        config.policy.mode = PolicyMode::Capacity;
        config.policy.capacity = Some(capacity);
        config
    }

    /// Recency config with the given learning rate.
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        let mut config = Self::default();
        config.policy.mode = PolicyMode::Recency;
        config.policy.learning_rate = learning_rate;
        config
    }

    /// Same config with a fixed sampling seed.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.sampling.seed = Some(seed);
        self
    }

    /// Load a config file, then apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let mut config: CatdistConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        tracing::debug!(path = %path.display(), mode = ?config.policy.mode, "config loaded");
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: CatdistConfig =
            toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
                path: "<string>".to_string(),
                message: e.to_string(),
            })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &CatdistConfig) -> Result<(), ConfigError> {
        if let Some(capacity) = config.policy.capacity {
            if capacity.is_nan() || capacity < 0.0 {
                return Err(ConfigError::ValidationFailed {
                    field: "policy.capacity".to_string(),
                    message: "must be a non-negative number".to_string(),
                });
            }
        }
        let rate = config.policy.learning_rate;
        if rate.is_nan() || rate < 0.0 {
            return Err(ConfigError::ValidationFailed {
                field: "policy.learning_rate".to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env_overrides(config: &mut CatdistConfig) {
        if let Ok(val) = std::env::var("CATDIST_CAPACITY") {
            if let Ok(v) = val.parse::<f64>() {
                config.policy.mode = PolicyMode::Capacity;
                config.policy.capacity = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CATDIST_LEARNING_RATE") {
            if let Ok(v) = val.parse::<f64>() {
                config.policy.mode = PolicyMode::Recency;
                config.policy.learning_rate = v;
            }
        }
        if let Ok(val) = std::env::var("CATDIST_SAMPLING_CROSSOVER") {
            if let Ok(v) = val.parse::<usize>() {
                config.sampling.crossover = v;
            }
        }
        if let Ok(val) = std::env::var("CATDIST_SEED") {
            if let Ok(v) = val.parse::<u64>() {
                config.sampling.seed = Some(v);
            }
        }
    }
}
