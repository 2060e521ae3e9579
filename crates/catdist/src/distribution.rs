//! `CategoricalDistribution`: the public façade over store, sampling,
//! adaptation and snapshots.

use std::fmt;
use std::hash::Hash;

use catdist_core::config::defaults::{DEFAULT_MASS, DEFAULT_SAMPLE_COUNT};
use catdist_core::config::{ForgettingStrategy, PolicyMode};
use catdist_core::constants::{DEFAULT_PRINT_PRECISION, MAX_PRINT_PRECISION};
use catdist_core::errors::{DistributionError, DistributionResult};
use catdist_core::CatdistConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::adaptation::{self, Policy};
use crate::sampling;
use crate::snapshot::Snapshot;
use crate::store::{Entry, WeightStore};

/// Adaptive categorical distribution over categories of type `C`.
///
/// Learns relative frequencies from a stream of events, answers
/// probability and ranking queries, and samples from what it has learned.
/// Any failed operation leaves the distribution unchanged.
#[derive(Debug, Clone)]
pub struct CategoricalDistribution<C> {
    store: WeightStore<C>,
    policy: Policy,
    config: CatdistConfig,
    rng: StdRng,
}

impl<C: Clone + Eq + Hash> Default for CategoricalDistribution<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone + Eq + Hash> CategoricalDistribution<C> {
    /// Unbounded flat-increment distribution, entropy-seeded.
    pub fn new() -> Self {
        let config = CatdistConfig::default();
        Self {
            store: WeightStore::new(),
            policy: Policy::Capacity {
                capacity: config.policy.effective_capacity(),
                strategy: config.policy.forgetting,
            },
            rng: rng_for(&config),
            config,
        }
    }

    pub fn with_capacity(capacity: f64) -> DistributionResult<Self> {
        Self::from_config(CatdistConfig::with_capacity(capacity))
    }

    pub fn with_learning_rate(learning_rate: f64) -> DistributionResult<Self> {
        Self::from_config(CatdistConfig::with_learning_rate(learning_rate))
    }

    pub fn from_config(config: CatdistConfig) -> DistributionResult<Self> {
        let policy = Policy::from_config(&config.policy)?;
        Ok(Self {
            store: WeightStore::new(),
            policy,
            rng: rng_for(&config),
            config,
        })
    }

    // --- Mutators ---

    /// Learn one unit-mass event per category, in order.
    pub fn learn(&mut self, categories: &[C]) -> DistributionResult<&mut Self> {
        self.learn_mass(categories, DEFAULT_MASS)
    }

    pub fn learn_one(&mut self, category: &C) -> DistributionResult<&mut Self> {
        self.learn_mass(std::slice::from_ref(category), DEFAULT_MASS)
    }

    /// Learn one event of `mass` per category. A negative mass unlearns.
    pub fn learn_mass(&mut self, categories: &[C], mass: f64) -> DistributionResult<&mut Self> {
        let mass = adaptation::validate_mass(mass)?;
        if mass < 0.0 {
            return self.unlearn_mass(categories, -mass);
        }
        if mass == 0.0 || categories.is_empty() {
            return Ok(self);
        }

        adaptation::preflight(&self.store, &self.policy, mass, categories.len())?;
        for category in categories {
            adaptation::learn(
                &mut self.store,
                &mut self.policy,
                category,
                mass,
                &mut self.rng,
            )?;
        }
        Ok(self)
    }

    pub fn unlearn(&mut self, categories: &[C]) -> DistributionResult<&mut Self> {
        self.unlearn_mass(categories, DEFAULT_MASS)
    }

    pub fn unlearn_one(&mut self, category: &C) -> DistributionResult<&mut Self> {
        self.unlearn_mass(std::slice::from_ref(category), DEFAULT_MASS)
    }

    /// Reverse `learn_mass`. Weights are floored at zero, which removes the
    /// category. A negative mass learns.
    pub fn unlearn_mass(&mut self, categories: &[C], mass: f64) -> DistributionResult<&mut Self> {
        let mass = adaptation::validate_mass(mass)?;
        if mass < 0.0 {
            return self.learn_mass(categories, -mass);
        }
        if mass == 0.0 {
            return Ok(self);
        }

        // Events are undone newest first.
        for category in categories.iter().rev() {
            adaptation::unlearn(&mut self.store, &mut self.policy, category, mass);
        }
        Ok(self)
    }

    /// Replace the whole distribution with the given weights.
    ///
    /// Weights need not be normalised. Later duplicates win, zero weights
    /// are dropped and the result is ranked by a stable descending sort.
    pub fn set_dist<I>(&mut self, weights: I) -> DistributionResult<&mut Self>
    where
        I: IntoIterator<Item = (C, f64)>,
    {
        let mut entries: Vec<Entry<C>> = Vec::new();
        let mut seen: FxHashMap<C, usize> = FxHashMap::default();

        for (category, weight) in weights {
            if weight.is_nan() || weight < 0.0 {
                return Err(DistributionError::invalid_distribution(format!(
                    "weight {weight} is not a non-negative number"
                )));
            }
            match seen.get(&category) {
                Some(&i) => entries[i].weight = weight,
                None => {
                    seen.insert(category.clone(), entries.len());
                    entries.push(Entry::new(category, weight));
                }
            }
        }
        let sum: f64 = entries.iter().map(|e| e.weight).sum();
        if !sum.is_finite() {
            return Err(DistributionError::invalid_distribution(
                "weight sum is not finite",
            ));
        }

        let mut store = WeightStore::from_unsorted(entries)
            .map_err(|e| DistributionError::invalid_distribution(e.to_string()))?;
        if let Policy::Capacity { capacity, strategy } = self.policy {
            adaptation::enforce_capacity(&mut store, capacity, strategy, &mut self.rng);
        }
        debug!(categories = store.len(), "distribution replaced");

        self.store = store;
        self.policy.reset_event_weight();
        Ok(self)
    }

    /// Switch to (or stay in) bounded mode with a new capacity, forgetting
    /// down to it if needed.
    pub fn set_capacity(&mut self, capacity: f64) -> DistributionResult<&mut Self> {
        let capacity = adaptation::validate_capacity(capacity)?;
        let strategy = self.config.policy.forgetting;
        if self.policy.mode() != PolicyMode::Capacity {
            debug!(capacity, "switching to capacity mode");
        }

        self.policy = Policy::Capacity { capacity, strategy };
        self.config.policy.mode = PolicyMode::Capacity;
        self.config.policy.capacity = capacity.is_finite().then_some(capacity);
        adaptation::enforce_capacity(&mut self.store, capacity, strategy, &mut self.rng);
        Ok(self)
    }

    /// Switch to (or stay in) recency mode with a new learning rate.
    ///
    /// Switching restarts the recurrence at event weight 1. Staying only
    /// changes the rate applied to future events.
    pub fn set_learning_rate(&mut self, learning_rate: f64) -> DistributionResult<&mut Self> {
        let learning_rate = adaptation::validate_learning_rate(learning_rate)?;
        match &mut self.policy {
            Policy::Recency {
                learning_rate: current,
                ..
            } => *current = learning_rate,
            Policy::Capacity { .. } => {
                debug!(learning_rate, "switching to recency mode");
                self.policy = Policy::Recency {
                    learning_rate,
                    event_weight: catdist_core::config::defaults::INITIAL_EVENT_WEIGHT,
                };
            }
        }
        self.config.policy.mode = PolicyMode::Recency;
        self.config.policy.learning_rate = learning_rate;
        Ok(self)
    }

    /// Strategy used by bounded mode from now on.
    pub fn set_forgetting_strategy(&mut self, strategy: ForgettingStrategy) -> &mut Self {
        if let Policy::Capacity { strategy: current, .. } = &mut self.policy {
            *current = strategy;
        }
        self.config.policy.forgetting = strategy;
        self
    }

    // --- Sampling ---

    /// Draw `n` categories (default 1) with probability proportional to
    /// weight, using the distribution's own random source.
    pub fn sample(&mut self, n: Option<usize>, ordered: bool) -> Vec<C> {
        sampling::sample(
            &self.store,
            n.unwrap_or(DEFAULT_SAMPLE_COUNT),
            ordered,
            self.config.sampling.crossover,
            &mut self.rng,
        )
    }

    /// Like [`sample`](Self::sample) with a caller-supplied random source.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: Option<usize>,
        ordered: bool,
    ) -> Vec<C> {
        sampling::sample(
            &self.store,
            n.unwrap_or(DEFAULT_SAMPLE_COUNT),
            ordered,
            self.config.sampling.crossover,
            rng,
        )
    }

    // --- Accessors ---

    /// `0` for unknown categories and for an empty distribution.
    pub fn prob(&self, category: &C) -> f64 {
        match self.store.get(category) {
            Some(weight) => weight / self.store.weight_sum(),
            None => 0.0,
        }
    }

    pub fn probs(&self, categories: &[C]) -> Vec<f64> {
        categories.iter().map(|c| self.prob(c)).collect()
    }

    /// Position in the ranking, `None` for unknown categories.
    pub fn rank(&self, category: &C) -> Option<usize> {
        self.store.rank(category)
    }

    pub fn ranks(&self, categories: &[C]) -> Vec<Option<usize>> {
        categories.iter().map(|c| self.rank(c)).collect()
    }

    /// The `n` most probable categories. `0` or more than the category
    /// count returns them all.
    pub fn head(&self, n: usize) -> Vec<&C> {
        let take = if n == 0 { self.store.len() } else { n };
        self.store.iter().take(take).map(|e| &e.category).collect()
    }

    /// Categories whose weight is within `tolerance` (a fraction of the top
    /// weight) of the most probable one.
    pub fn peak(&self, tolerance: f64) -> Vec<&C> {
        let tolerance = if tolerance.is_nan() {
            0.0
        } else {
            tolerance.clamp(0.0, 1.0)
        };
        let Some(top) = self.store.entries().first() else {
            return Vec::new();
        };
        let threshold = top.weight * (1.0 - tolerance);
        self.store
            .iter()
            .take_while(|e| e.weight >= threshold)
            .map(|e| &e.category)
            .collect()
    }

    /// Visit every category in probability order with its probability and
    /// rank.
    pub fn each<F: FnMut(&C, f64, usize)>(&self, mut f: F) {
        let sum = self.store.weight_sum();
        for (rank, entry) in self.store.iter().enumerate() {
            f(&entry.category, entry.weight / sum, rank);
        }
    }

    pub fn map<T, F: FnMut(&C, f64, usize) -> T>(&self, mut f: F) -> Vec<T> {
        let sum = self.store.weight_sum();
        self.store
            .iter()
            .enumerate()
            .map(|(rank, entry)| f(&entry.category, entry.weight / sum, rank))
            .collect()
    }

    /// Normalised probabilities of every category.
    pub fn dist(&self) -> FxHashMap<C, f64> {
        let sum = self.store.weight_sum();
        self.store
            .iter()
            .map(|e| (e.category.clone(), e.weight / sum))
            .collect()
    }

    pub fn num_categories(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total unnormalised weight.
    pub fn weight_sum(&self) -> f64 {
        self.store.weight_sum()
    }

    /// Weight of the most recent event in recency mode.
    pub fn event_weight(&self) -> Option<f64> {
        match self.policy {
            Policy::Recency { event_weight, .. } => Some(event_weight),
            Policy::Capacity { .. } => None,
        }
    }

    pub fn capacity(&self) -> Option<f64> {
        match self.policy {
            Policy::Capacity { capacity, .. } => Some(capacity),
            Policy::Recency { .. } => None,
        }
    }

    pub fn learning_rate(&self) -> Option<f64> {
        match self.policy {
            Policy::Recency { learning_rate, .. } => Some(learning_rate),
            Policy::Capacity { .. } => None,
        }
    }

    pub fn store(&self) -> &WeightStore<C> {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn config(&self) -> &CatdistConfig {
        &self.config
    }

    // --- Snapshots ---

    pub fn dump(&self) -> Snapshot<C> {
        Snapshot::from_store(&self.store, self.policy.scalar())
    }

    /// Replace state from a snapshot whose entries are in probability order.
    ///
    /// The policy kind is kept and the scalar is read in that kind. Recency
    /// mode restarts at event weight 1.
    pub fn load(&mut self, snapshot: &Snapshot<C>) -> DistributionResult<&mut Self> {
        let policy = self.policy.with_scalar(snapshot.policy)?;
        let mut store = snapshot.to_store()?;
        if let Policy::Capacity { capacity, strategy } = policy {
            adaptation::enforce_capacity(&mut store, capacity, strategy, &mut self.rng);
        }
        debug!(
            categories = store.len(),
            scalar = snapshot.policy,
            "snapshot loaded"
        );

        self.store = store;
        self.policy = policy;
        match policy {
            Policy::Capacity { capacity, .. } => {
                self.config.policy.capacity = capacity.is_finite().then_some(capacity);
            }
            Policy::Recency { learning_rate, .. } => {
                self.config.policy.learning_rate = learning_rate;
            }
        }
        Ok(self)
    }

    /// Independent copy with the same weights, policy and config.
    pub fn copy(&self) -> DistributionResult<Self> {
        let mut copy = Self::from_config(self.config.clone())?;
        copy.policy = self.policy;
        copy.load(&self.dump())?;
        // `load` restarts the recency recurrence; carry the live one over.
        copy.policy = self.policy;
        Ok(copy)
    }

    /// Independent distribution holding only `categories`, with their
    /// unchanged weights and the same policy.
    pub fn subset(&self, categories: &[C]) -> Self {
        let wanted: FxHashSet<&C> = categories.iter().collect();
        Self {
            store: self.store.filtered(|c| wanted.contains(c)),
            policy: self.policy,
            config: self.config.clone(),
            rng: rng_for(&self.config),
        }
    }
}

impl<C: Clone + Eq + Hash + Serialize> CategoricalDistribution<C> {
    /// Flat JSON form `[c1, w1, …, scalar]`.
    pub fn dump_json(&self) -> DistributionResult<String> {
        self.dump().to_json()
    }
}

impl<C: Clone + Eq + Hash + DeserializeOwned> CategoricalDistribution<C> {
    pub fn load_json(&mut self, json: &str) -> DistributionResult<&mut Self> {
        let snapshot = Snapshot::from_json(json)?;
        self.load(&snapshot)
    }
}

impl<C: Clone + Eq + Hash + fmt::Display> CategoricalDistribution<C> {
    /// One line per category, in probability order: the category padded to
    /// a common width, then its probability with `precision` digits
    /// (clamped to `0..=10`).
    pub fn print(&self, precision: usize) -> String {
        let precision = precision.min(MAX_PRINT_PRECISION);
        let names: Vec<String> = self.store.iter().map(|e| e.category.to_string()).collect();
        let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);

        let sum = self.store.weight_sum();
        let mut out = String::new();
        for (name, entry) in names.iter().zip(self.store.iter()) {
            out.push_str(&format!(
                "{name:<width$} {:.precision$}\n",
                entry.weight / sum
            ));
        }
        out
    }
}

impl<C: Clone + Eq + Hash + fmt::Display> fmt::Display for CategoricalDistribution<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(DEFAULT_PRINT_PRECISION))
    }
}

fn rng_for(config: &CatdistConfig) -> StdRng {
    match config.sampling.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
