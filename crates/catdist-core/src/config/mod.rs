//! Configuration for the distribution engine.
//! TOML-based, resolved as: env > file > defaults.

pub mod catdist_config;
pub mod defaults;
pub mod policy_config;
pub mod sampling_config;

pub use catdist_config::CatdistConfig;
pub use policy_config::{ForgettingStrategy, PolicyConfig, PolicyMode};
pub use sampling_config::SamplingConfig;
