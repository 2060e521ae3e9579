//! # catdist
//!
//! Adaptive categorical distribution over an unbounded set of categories.
//! Tracks relative frequencies from a stream of events, samples from the
//! learned distribution, and optionally forgets old evidence either by
//! bounding the weight sum or by exponential recency weighting.

pub mod adaptation;
pub mod distribution;
pub mod sampling;
pub mod snapshot;
pub mod store;

pub use adaptation::Policy;
pub use catdist_core::{CatdistConfig, DistributionError, DistributionResult, ForgettingStrategy};
pub use distribution::CategoricalDistribution;
pub use sampling::SamplingAlgorithm;
pub use snapshot::Snapshot;
pub use store::{Entry, WeightStore};
