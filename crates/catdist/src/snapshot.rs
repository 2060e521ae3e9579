//! Flat snapshot form of a distribution.
//!
//! A snapshot is the ranking in probability order followed by the policy
//! scalar. On the wire it is one JSON array `[c1, w1, …, ck, wk, scalar]`
//! where `null` stands for an infinite scalar.

use std::hash::Hash;

use catdist_core::errors::{DistributionError, DistributionResult};
use serde::de::DeserializeOwned;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::store::{Entry, WeightStore};

/// Ranking plus policy scalar (capacity or learning rate).
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<C> {
    /// `(category, weight)` pairs, most probable first.
    pub entries: Vec<(C, f64)>,
    pub policy: f64,
}

impl<C: Clone + Eq + Hash> Snapshot<C> {
    pub fn from_store(store: &WeightStore<C>, policy: f64) -> Self {
        Self {
            entries: store
                .iter()
                .map(|e| (e.category.clone(), e.weight))
                .collect(),
            policy,
        }
    }

    /// Rebuild the store positionally. The entries must already be in
    /// probability order.
    pub fn to_store(&self) -> DistributionResult<WeightStore<C>> {
        WeightStore::from_sorted(
            self.entries
                .iter()
                .map(|(c, w)| Entry::new(c.clone(), *w))
                .collect(),
        )
    }
}

impl<C: Serialize> Serialize for Snapshot<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len() * 2 + 1))?;
        for (category, weight) in &self.entries {
            seq.serialize_element(category)?;
            seq.serialize_element(weight)?;
        }
        let scalar = if self.policy.is_finite() {
            Some(self.policy)
        } else {
            None
        };
        seq.serialize_element(&scalar)?;
        seq.end()
    }
}

impl<C: Serialize> Snapshot<C> {
    pub fn to_value(&self) -> DistributionResult<Value> {
        serde_json::to_value(self).map_err(|e| DistributionError::invalid_dump(e.to_string()))
    }

    pub fn to_json(&self) -> DistributionResult<String> {
        serde_json::to_string(self).map_err(|e| DistributionError::invalid_dump(e.to_string()))
    }
}

impl<C: DeserializeOwned> Snapshot<C> {
    /// Decode the flat array form.
    ///
    /// Only the shape is checked here. Weight and scalar ranges are checked
    /// when the snapshot is loaded.
    pub fn from_value(value: &Value) -> DistributionResult<Self> {
        let Value::Array(items) = value else {
            return Err(DistributionError::NotAnArray);
        };
        if items.len() % 2 == 0 {
            return Err(DistributionError::invalid_dump(format!(
                "expected an odd number of elements, got {}",
                items.len()
            )));
        }

        let (scalar, pairs) = match items.split_last() {
            Some(split) => split,
            None => return Err(DistributionError::invalid_dump("empty dump")),
        };

        let mut entries = Vec::with_capacity(pairs.len() / 2);
        for (i, pair) in pairs.chunks_exact(2).enumerate() {
            let category = serde_json::from_value::<C>(pair[0].clone()).map_err(|e| {
                DistributionError::invalid_dump(format!("category {i}: {e}"))
            })?;
            let weight = pair[1].as_f64().ok_or_else(|| {
                DistributionError::invalid_dump(format!("weight {i} is not a number"))
            })?;
            entries.push((category, weight));
        }

        let policy = match scalar {
            Value::Null => f64::INFINITY,
            other => other.as_f64().ok_or_else(|| {
                DistributionError::invalid_dump("policy scalar is not a number")
            })?,
        };

        Ok(Self { entries, policy })
    }

    pub fn from_json(json: &str) -> DistributionResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| DistributionError::invalid_dump(e.to_string()))?;
        Self::from_value(&value)
    }
}
