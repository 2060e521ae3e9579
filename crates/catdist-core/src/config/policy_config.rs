use serde::{Deserialize, Serialize};

use super::defaults;

/// Which adaptation model drives `learn` / `unlearn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Flat increments with a bounded weight sum.
    #[default]
    Capacity,
    /// Exponential recency weighting driven by a learning rate.
    Recency,
}

/// How the bounded-capacity policy sheds weight when the sum would exceed
/// the capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForgettingStrategy {
    /// Multiply every weight so the sum drops to the capacity.
    #[default]
    Shrink,
    /// Repeatedly decrement a category drawn by probability.
    SampledDecrement,
}

/// Adaptation policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub mode: PolicyMode,
    /// Maximum weight sum in capacity mode. `None` means unbounded.
    pub capacity: Option<f64>,
    /// Per-event multiplier in recency mode. `1.0` disables forgetting.
    pub learning_rate: f64,
    pub forgetting: ForgettingStrategy,
}

impl PolicyConfig {
    /// Capacity with `None` resolved to infinity.
    pub fn effective_capacity(&self) -> f64 {
        self.capacity.unwrap_or(f64::INFINITY)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::default(),
            capacity: defaults::DEFAULT_CAPACITY,
            learning_rate: defaults::DEFAULT_LEARNING_RATE,
            forgetting: ForgettingStrategy::default(),
        }
    }
}
