use serde::{Deserialize, Serialize};

use super::defaults;

/// Sampling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Category count above which unordered sampling uses the batch
    /// algorithm followed by a shuffle.
    pub crossover: usize,
    /// Seed for the distribution's own random source. `None` seeds from
    /// OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            crossover: defaults::DEFAULT_SAMPLING_CROSSOVER,
            seed: None,
        }
    }
}
