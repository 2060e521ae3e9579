//! Error handling for catdist.
//! One error enum per subsystem, `thiserror` only.

pub mod catdist_error;
pub mod config_error;
pub mod distribution_error;

pub use catdist_error::{CatdistError, CatdistResult};
pub use config_error::ConfigError;
pub use distribution_error::{DistributionError, DistributionResult};
