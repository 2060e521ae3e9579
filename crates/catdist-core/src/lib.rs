//! # catdist-core
//!
//! Foundation crate for the adaptive categorical distribution.
//! Defines errors, config, defaults, and tracing setup shared by the engine.

pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;

// Re-export the most commonly used types at the crate root.
pub use config::{CatdistConfig, ForgettingStrategy, PolicyConfig, PolicyMode, SamplingConfig};
pub use errors::{CatdistError, CatdistResult, ConfigError, DistributionError, DistributionResult};
