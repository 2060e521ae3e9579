//! Weighted sampling with replacement.
//!
//! Two algorithms:
//! - **Simple**: one linear scan of the ranking per draw, `O(n·m)`.
//! - **Batch**: `n` sorted uniform targets merged against the cumulative
//!   weights in a single pass, `O(n + m)`, results in probability order.
//!
//! Unordered requests use Simple below the crossover category count and
//! Batch plus a Fisher–Yates shuffle above it.

use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::store::WeightStore;

/// Which algorithm serves a `sample` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingAlgorithm {
    Simple,
    Batch,
    BatchShuffled,
}

impl SamplingAlgorithm {
    /// Pick the algorithm for a request.
    pub fn choose(num_categories: usize, ordered: bool, crossover: usize) -> Self {
        if ordered {
            Self::Batch
        } else if num_categories > crossover {
            Self::BatchShuffled
        } else {
            Self::Simple
        }
    }
}

/// Draw `n` categories with probability proportional to weight.
pub fn sample<C, R>(
    store: &WeightStore<C>,
    n: usize,
    ordered: bool,
    crossover: usize,
    rng: &mut R,
) -> Vec<C>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    if store.is_empty() || n == 0 {
        return Vec::new();
    }

    let algorithm = SamplingAlgorithm::choose(store.len(), ordered, crossover);
    trace!(?algorithm, n, categories = store.len(), "sampling");

    match algorithm {
        SamplingAlgorithm::Simple => sample_simple(store, n, rng),
        SamplingAlgorithm::Batch => sample_batch(store, n, rng),
        SamplingAlgorithm::BatchShuffled => {
            let mut result = sample_batch(store, n, rng);
            result.shuffle(rng);
            result
        }
    }
}

/// Independent draws, each scanning the ranking until the running sum
/// passes a uniform target in `[0, weightSum)`.
pub fn sample_simple<C, R>(store: &WeightStore<C>, n: usize, rng: &mut R) -> Vec<C>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let mut result = Vec::with_capacity(n);
    if store.is_empty() {
        return result;
    }
    for _ in 0..n {
        if let Some(category) = draw_one(store, rng) {
            result.push(category);
        }
    }
    result
}

/// One draw. `None` only for an empty store.
pub fn draw_one<C, R>(store: &WeightStore<C>, rng: &mut R) -> Option<C>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let entries = store.entries();
    let last = entries.last()?;
    let x = rng.gen::<f64>() * store.weight_sum();

    let mut cumulative = 0.0;
    for entry in entries {
        cumulative += entry.weight;
        if x < cumulative {
            return Some(entry.category.clone());
        }
    }
    // Rounding left the scanned sum just below the stored one.
    Some(last.category.clone())
}

/// `n` draws returned in probability order, most probable first.
pub fn sample_batch<C, R>(store: &WeightStore<C>, n: usize, rng: &mut R) -> Vec<C>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let entries = store.entries();
    let mut result = Vec::with_capacity(n);
    if entries.is_empty() || n == 0 {
        return result;
    }

    let targets = sorted_uniforms(rng, n, 0.0, store.weight_sum());

    let mut cat = 0;
    let mut cumulative = entries[0].weight;
    for target in targets {
        // Head inclusive, tail exclusive.
        while target >= cumulative && cat + 1 < entries.len() {
            cat += 1;
            cumulative += entries[cat].weight;
        }
        result.push(entries[cat].category.clone());
    }
    result
}

/// `n` uniform variates over `[min, max)` generated already ascending,
/// in `O(n)`, from the inverse CDF of uniform order statistics:
///
/// ```text
/// u[0] = 1 - U^(1/n)
/// u[i] = u[i-1] + (1 - u[i-1]) · (1 - U^(1/(n-i)))
/// ```
pub fn sorted_uniforms<R: Rng + ?Sized>(rng: &mut R, n: usize, min: f64, max: f64) -> Vec<f64> {
    let mut x = Vec::with_capacity(n);
    if n == 0 {
        return x;
    }

    let mut prev = 1.0 - rng.gen::<f64>().powf(1.0 / n as f64);
    x.push(prev);
    for i in 1..n {
        let normalized = 1.0 - rng.gen::<f64>().powf(1.0 / (n - i) as f64);
        prev += (1.0 - prev) * normalized;
        x.push(prev);
    }

    let span = max - min;
    for value in &mut x {
        *value = min + span * *value;
    }
    x
}
