//! Top-level error aggregating the subsystem errors.

use super::{ConfigError, DistributionError};

/// Result alias for callers combining config loading and distribution use.
pub type CatdistResult<T> = Result<T, CatdistError>;

#[derive(Debug, thiserror::Error)]
pub enum CatdistError {
    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
