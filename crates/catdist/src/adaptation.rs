//! Adaptation policies: turn a learned or unlearned event into weight
//! changes on the store.
//!
//! - **Capacity**: flat increments; when the weight sum would exceed the
//!   capacity, older evidence is forgotten first.
//! - **Recency**: every event weighs `learning_rate` times the previous one.
//!   Weights are rescaled by a common factor whenever the recurrence would
//!   leave the `f64` range, which leaves every probability unchanged.

use std::hash::Hash;

use catdist_core::config::defaults::INITIAL_EVENT_WEIGHT;
use catdist_core::config::{ForgettingStrategy, PolicyConfig, PolicyMode};
use catdist_core::errors::{DistributionError, DistributionResult};
use rand::Rng;
use tracing::{debug, warn};

use crate::sampling;
use crate::store::WeightStore;

/// Smallest event weight the recency recurrence shrinks to.
const MIN_EVENT_WEIGHT: f64 = f64::MIN_POSITIVE;

/// Smallest positive `f64`, the floor of a single increment.
const SMALLEST_INCREMENT: f64 = 5e-324;

/// Active adaptation policy and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    Capacity {
        /// Maximum weight sum, `f64::INFINITY` when unbounded.
        capacity: f64,
        strategy: ForgettingStrategy,
    },
    Recency {
        learning_rate: f64,
        /// Weight carried by the most recent event. The next event gets
        /// `event_weight * learning_rate`.
        event_weight: f64,
    },
}

impl Policy {
    pub fn from_config(config: &PolicyConfig) -> DistributionResult<Self> {
        match config.mode {
            PolicyMode::Capacity => Ok(Self::Capacity {
                capacity: validate_capacity(config.effective_capacity())?,
                strategy: config.forgetting,
            }),
            PolicyMode::Recency => Ok(Self::Recency {
                learning_rate: validate_learning_rate(config.learning_rate)?,
                event_weight: INITIAL_EVENT_WEIGHT,
            }),
        }
    }

    pub fn mode(&self) -> PolicyMode {
        match self {
            Self::Capacity { .. } => PolicyMode::Capacity,
            Self::Recency { .. } => PolicyMode::Recency,
        }
    }

    /// The single scalar a snapshot records: capacity or learning rate.
    pub fn scalar(&self) -> f64 {
        match *self {
            Self::Capacity { capacity, .. } => capacity,
            Self::Recency { learning_rate, .. } => learning_rate,
        }
    }

    /// Same kind of policy with a new scalar, validated for that kind.
    pub fn with_scalar(&self, scalar: f64) -> DistributionResult<Self> {
        match *self {
            Self::Capacity { strategy, .. } => Ok(Self::Capacity {
                capacity: validate_capacity(scalar)?,
                strategy,
            }),
            Self::Recency { .. } => Ok(Self::Recency {
                learning_rate: validate_learning_rate(scalar)?,
                event_weight: INITIAL_EVENT_WEIGHT,
            }),
        }
    }

    /// Restart the recency recurrence. No effect in capacity mode.
    pub fn reset_event_weight(&mut self) {
        if let Self::Recency { event_weight, .. } = self {
            *event_weight = INITIAL_EVENT_WEIGHT;
        }
    }
}

pub fn validate_capacity(capacity: f64) -> DistributionResult<f64> {
    if capacity.is_nan() || capacity < 0.0 {
        return Err(DistributionError::InvalidCapacity { value: capacity });
    }
    Ok(capacity)
}

/// Accepts `[0, +inf]`. Infinity means only the newest event counts.
pub fn validate_learning_rate(rate: f64) -> DistributionResult<f64> {
    if rate.is_nan() || rate < 0.0 {
        return Err(DistributionError::InvalidAdaptationRate { value: rate });
    }
    Ok(rate)
}

pub fn validate_mass(mass: f64) -> DistributionResult<f64> {
    if !mass.is_finite() {
        return Err(DistributionError::InvalidMass { value: mass });
    }
    Ok(mass)
}

/// Reject a batch of `count` learns of `mass` whose increments cannot stay
/// finite whatever rescaling happens. Nothing is mutated.
pub fn preflight<C: Clone + Eq + Hash>(
    store: &WeightStore<C>,
    policy: &Policy,
    mass: f64,
    count: usize,
) -> DistributionResult<()> {
    let fits = match *policy {
        Policy::Capacity { capacity, .. } => {
            (store.weight_sum() + count as f64 * mass.min(capacity)).is_finite()
        }
        Policy::Recency { learning_rate, .. } => {
            !learning_rate.is_finite() || (learning_rate * mass).is_finite()
        }
    };
    if fits {
        Ok(())
    } else {
        warn!(mass, count, scalar = policy.scalar(), "learn would overflow");
        Err(DistributionError::overflow("learn"))
    }
}

/// Learn one event of positive `mass`.
pub fn learn<C, R>(
    store: &mut WeightStore<C>,
    policy: &mut Policy,
    category: &C,
    mass: f64,
    rng: &mut R,
) -> DistributionResult<()>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    match policy {
        Policy::Capacity { capacity, strategy } => {
            learn_bounded(store, *capacity, *strategy, category, mass, rng)
        }
        Policy::Recency {
            learning_rate,
            event_weight,
        } => learn_recency(store, *learning_rate, event_weight, category, mass),
    }
}

/// Unlearn one event of positive `mass`. Weights are floored at zero.
pub fn unlearn<C>(store: &mut WeightStore<C>, policy: &mut Policy, category: &C, mass: f64)
where
    C: Clone + Eq + Hash,
{
    match policy {
        Policy::Capacity { .. } => {
            if let Some(weight) = store.get(category) {
                store.upsert(category.clone(), (weight - mass).max(0.0));
            }
        }
        Policy::Recency {
            learning_rate,
            event_weight,
        } => unlearn_recency(store, *learning_rate, event_weight, category, mass),
    }
}

fn learn_bounded<C, R>(
    store: &mut WeightStore<C>,
    capacity: f64,
    strategy: ForgettingStrategy,
    category: &C,
    mass: f64,
    rng: &mut R,
) -> DistributionResult<()>
where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    // An increment can never exceed the whole capacity.
    let increment = mass.min(capacity);
    if increment <= 0.0 {
        return Ok(());
    }

    let planned = store.weight_sum() + increment;
    if !planned.is_finite() {
        warn!(increment, "weight sum would overflow");
        return Err(DistributionError::overflow("learn"));
    }
    if planned > capacity {
        forget(store, planned - capacity, strategy, rng);
    }

    store.add(category, increment);
    Ok(())
}

/// Shed `excess` weight from the store using `strategy`.
pub fn forget<C, R>(
    store: &mut WeightStore<C>,
    excess: f64,
    strategy: ForgettingStrategy,
    rng: &mut R,
) where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    if excess <= 0.0 || store.is_empty() {
        return;
    }
    debug!(excess, ?strategy, sum = store.weight_sum(), "forgetting");

    match strategy {
        ForgettingStrategy::Shrink => {
            let sum = store.weight_sum();
            let target = (sum - excess).max(0.0);
            store.scale(target / sum);
        }
        ForgettingStrategy::SampledDecrement => {
            // Unit draws for a small excess. A large one is split into `len`
            // equal parts. Each round either removes a full unit or empties a
            // category, so there are about `2 * len` rounds at most.
            let unit = (excess / store.len() as f64).max(1.0);
            let mut remaining = excess;
            while remaining > 0.0 {
                let Some(category) = sampling::draw_one(store, rng) else {
                    break;
                };
                let Some(weight) = store.get(&category) else {
                    break;
                };
                let decrement = remaining.min(unit).min(weight);
                store.upsert(category, weight - decrement);
                remaining -= decrement;
            }
        }
    }
}

/// Bring the weight sum down to `capacity` if it is above it.
pub fn enforce_capacity<C, R>(
    store: &mut WeightStore<C>,
    capacity: f64,
    strategy: ForgettingStrategy,
    rng: &mut R,
) where
    C: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let excess = store.weight_sum() - capacity;
    if excess > 0.0 {
        forget(store, excess, strategy, rng);
    }
}

fn learn_recency<C>(
    store: &mut WeightStore<C>,
    rate: f64,
    event_weight: &mut f64,
    category: &C,
    mass: f64,
) -> DistributionResult<()>
where
    C: Clone + Eq + Hash,
{
    // A zero rate freezes the distribution.
    if rate == 0.0 {
        return Ok(());
    }

    if !rate.is_finite() {
        debug!("infinite learning rate, keeping only the newest event");
        store.clear();
        *event_weight = INITIAL_EVENT_WEIGHT;
        store.add(category, mass * INITIAL_EVENT_WEIGHT);
        return Ok(());
    }

    // Plan the rescale before touching the store.
    let sum = store.weight_sum();
    let mut factor = 1.0;
    let mut current = *event_weight;
    let mut next = current * rate;

    if !next.is_finite() {
        factor = 1.0 / current;
        current = 1.0;
        next = rate;
    } else if next < MIN_EVENT_WEIGHT {
        // Grow the store back up if the older weights leave room for it.
        let up = 1.0 / current;
        if (sum * up + rate * mass).is_finite() {
            factor = up;
            current = 1.0;
            next = rate;
        }
    }

    let scaled_sum = sum * factor;
    if !(scaled_sum + next * mass).is_finite() {
        let divisor = scaled_sum.max(current);
        factor /= divisor;
        next /= divisor;
    }

    // No room left to rescale: hold the recurrence at the floor.
    next = next.max(MIN_EVENT_WEIGHT);

    let increment = event_increment(next, mass);
    if !increment.is_finite() || !(sum * factor + increment).is_finite() {
        warn!(rate, mass, "recency increment overflows after rescaling");
        return Err(DistributionError::overflow("learn"));
    }

    if factor != 1.0 {
        debug!(factor, "rescaling weights");
        store.scale(factor);
    }
    *event_weight = next;
    store.add(category, increment);
    Ok(())
}

fn unlearn_recency<C>(
    store: &mut WeightStore<C>,
    rate: f64,
    event_weight: &mut f64,
    category: &C,
    mass: f64,
) where
    C: Clone + Eq + Hash,
{
    if rate == 0.0 {
        return;
    }

    let present = match store.get(category) {
        Some(weight) => {
            let decrement = event_increment(*event_weight, mass);
            store.upsert(category.clone(), (weight - decrement).max(0.0));
            true
        }
        None => false,
    };

    // Step the recurrence back. Infinite rates have nothing to undo, and a
    // weight held at the floor was not shrunk by the learn being undone.
    if !rate.is_finite() || (rate < 1.0 && *event_weight <= MIN_EVENT_WEIGHT) {
        return;
    }
    let previous = *event_weight / rate;
    if previous.is_finite() && previous >= MIN_EVENT_WEIGHT {
        *event_weight = previous;
        return;
    }

    // Equivalent move: scale every weight by `rate` instead. Only worth it
    // when the category took part and no weight leaves the normal range.
    let smallest = store.entries().last().map_or(1.0, |entry| entry.weight);
    let representable =
        (store.weight_sum() * rate).is_finite() && smallest * rate >= MIN_EVENT_WEIGHT;
    if present && representable {
        debug!(rate, "rescaling weights to step the recurrence back");
        store.scale(rate);
    } else {
        *event_weight = previous.clamp(MIN_EVENT_WEIGHT, f64::MAX);
    }
}

/// Weight added or removed by one event. Never rounds a positive mass to zero.
fn event_increment(event_weight: f64, mass: f64) -> f64 {
    (event_weight * mass).max(SMALLEST_INCREMENT)
}
