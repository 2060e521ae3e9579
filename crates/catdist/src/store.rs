//! Weight store: category weights, their sum, and the probability ranking.

use std::hash::Hash;

use catdist_core::constants::WEIGHT_SUM_TOLERANCE;
use catdist_core::errors::{DistributionError, DistributionResult};
use rustc_hash::FxHashMap;

/// Rescan the weight sum once it drops this far below its recent peak.
/// Subtractions from a large running sum keep only its absolute precision.
const SUM_RESCAN_RATIO: f64 = 1e4;

/// A category and its current weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<C> {
    pub category: C,
    pub weight: f64,
}

impl<C> Entry<C> {
    pub fn new(category: C, weight: f64) -> Self {
        Self { category, weight }
    }
}

/// Category weights kept in descending order, most probable first.
///
/// `order[index[c]].category == c` for every stored `c`. Every stored weight
/// is strictly positive: a category whose weight reaches zero is removed.
/// Among equal weights, the most recently updated category comes first.
#[derive(Debug, Clone)]
pub struct WeightStore<C> {
    order: Vec<Entry<C>>,
    index: FxHashMap<C, usize>,
    weight_sum: f64,
    sum_peak: f64,
}

impl<C> Default for WeightStore<C> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: FxHashMap::default(),
            weight_sum: 0.0,
            sum_peak: 0.0,
        }
    }
}

impl<C: Clone + Eq + Hash> WeightStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries already in probability order.
    ///
    /// Zero weights are dropped. Rejects duplicate categories, negative or
    /// non-finite weights, and entries that are not in descending order.
    pub fn from_sorted(entries: Vec<Entry<C>>) -> DistributionResult<Self> {
        let mut store = Self::new();
        store.order.reserve(entries.len());

        for entry in entries {
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(DistributionError::InvalidWeight {
                    value: entry.weight,
                });
            }
            if entry.weight == 0.0 {
                continue;
            }
            if let Some(prev) = store.order.last() {
                if prev.weight < entry.weight {
                    return Err(DistributionError::invalid_dump(format!(
                        "weights not in probability order at position {}",
                        store.order.len()
                    )));
                }
            }
            if store.index.contains_key(&entry.category) {
                return Err(DistributionError::invalid_dump("duplicate category"));
            }
            store.index.insert(entry.category.clone(), store.order.len());
            store.weight_sum += entry.weight;
            store.order.push(entry);
        }

        Ok(store)
    }

    /// Build from unique entries in any order. Sorting is stable, so equal
    /// weights keep their input order.
    pub fn from_unsorted(mut entries: Vec<Entry<C>>) -> DistributionResult<Self> {
        entries.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        Self::from_sorted(entries)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }

    pub fn get(&self, category: &C) -> Option<f64> {
        self.index.get(category).map(|&i| self.order[i].weight)
    }

    pub fn contains(&self, category: &C) -> bool {
        self.index.contains_key(category)
    }

    /// Position in the ranking, `0` for the most probable category.
    pub fn rank(&self, category: &C) -> Option<usize> {
        self.index.get(category).copied()
    }

    /// Entries in probability order.
    pub fn entries(&self) -> &[Entry<C>] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<C>> {
        self.order.iter()
    }

    /// Set a category's weight and restore the ranking around it.
    ///
    /// Unknown categories are appended at the tail first. A weight of zero
    /// or less removes the category. Returns the new position.
    pub fn upsert(&mut self, category: C, weight: f64) -> Option<usize> {
        if weight <= 0.0 {
            self.remove(&category);
            return None;
        }

        let i = match self.index.get(&category) {
            Some(&i) => {
                let old = self.order[i].weight;
                self.order[i].weight = weight;
                self.shift_sum(weight - old);
                i
            }
            None => {
                let i = self.order.len();
                self.index.insert(category.clone(), i);
                self.order.push(Entry::new(category, weight));
                self.shift_sum(weight);
                i
            }
        };

        Some(self.reposition(i))
    }

    /// Add `delta` to a category's weight (creating it when positive).
    pub fn add(&mut self, category: &C, delta: f64) -> Option<usize> {
        let current = self.get(category).unwrap_or(0.0);
        self.upsert(category.clone(), current + delta)
    }

    /// Remove a category, returning its weight.
    pub fn remove(&mut self, category: &C) -> Option<f64> {
        let i = self.index.remove(category)?;
        let entry = self.order.remove(i);
        for (pos, moved) in self.order.iter().enumerate().skip(i) {
            if let Some(slot) = self.index.get_mut(&moved.category) {
                *slot = pos;
            }
        }
        self.shift_sum(-entry.weight);
        Some(entry.weight)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
        self.weight_sum = 0.0;
        self.sum_peak = 0.0;
    }

    /// Multiply every weight by `factor` and re-synchronise the sum.
    ///
    /// Categories that underflow to zero are dropped; they form a suffix of
    /// the ranking so the order of the rest is unchanged.
    pub fn scale(&mut self, factor: f64) {
        if factor == 1.0 {
            return;
        }
        if factor <= 0.0 {
            self.clear();
            return;
        }

        for entry in &mut self.order {
            entry.weight *= factor;
        }
        while let Some(last) = self.order.last() {
            if last.weight > 0.0 {
                break;
            }
            if let Some(dropped) = self.order.pop() {
                self.index.remove(&dropped.category);
            }
        }
        self.rescan_sum();
    }

    fn shift_sum(&mut self, delta: f64) {
        self.sum_peak = self.sum_peak.max(self.weight_sum);
        self.weight_sum += delta;
        if self.order.is_empty() {
            self.weight_sum = 0.0;
            self.sum_peak = 0.0;
        } else if self.sum_peak > self.weight_sum * SUM_RESCAN_RATIO {
            self.rescan_sum();
        }
    }

    fn rescan_sum(&mut self) {
        self.weight_sum = self.order.iter().map(|e| e.weight).sum();
        self.sum_peak = self.weight_sum;
    }

    /// A new store holding only the categories `keep` accepts, in the same
    /// relative order and with the same weights.
    pub fn filtered(&self, mut keep: impl FnMut(&C) -> bool) -> Self {
        let mut store = Self::new();
        for entry in self.order.iter().filter(|e| keep(&e.category)) {
            store.index.insert(entry.category.clone(), store.order.len());
            store.weight_sum += entry.weight;
            store.order.push(entry.clone());
        }
        store
    }

    /// Move the entry at `i` to its sorted position, assuming it is the only
    /// entry out of order. Cost is proportional to the distance moved.
    fn reposition(&mut self, mut i: usize) -> usize {
        let weight = self.order[i].weight;

        if i > 0 && self.order[i - 1].weight <= weight {
            // Towards the head, ahead of equal weights.
            while i > 0 && self.order[i - 1].weight <= weight {
                self.order.swap(i - 1, i);
                if let Some(slot) = self.index.get_mut(&self.order[i].category) {
                    *slot = i;
                }
                i -= 1;
            }
        } else {
            // Towards the tail, still ahead of equal weights.
            while i + 1 < self.order.len() && self.order[i + 1].weight > weight {
                self.order.swap(i, i + 1);
                if let Some(slot) = self.index.get_mut(&self.order[i].category) {
                    *slot = i;
                }
                i += 1;
            }
        }

        if let Some(slot) = self.index.get_mut(&self.order[i].category) {
            *slot = i;
        }
        i
    }

    /// Verify ordering, index, positivity, and sum invariants.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.order.len() != self.index.len() {
            return Err(format!(
                "order has {} entries but index has {}",
                self.order.len(),
                self.index.len()
            ));
        }

        let mut scanned = 0.0;
        for (pos, entry) in self.order.iter().enumerate() {
            if !(entry.weight > 0.0 && entry.weight.is_finite()) {
                return Err(format!("weight {} at position {pos}", entry.weight));
            }
            if pos > 0 && self.order[pos - 1].weight < entry.weight {
                return Err(format!("order not descending at position {pos}"));
            }
            match self.index.get(&entry.category) {
                Some(&i) if i == pos => {}
                other => return Err(format!("index {other:?} for position {pos}")),
            }
            scanned += entry.weight;
        }

        let tolerance = WEIGHT_SUM_TOLERANCE * scanned.max(1.0);
        if (self.weight_sum - scanned).abs() > tolerance {
            return Err(format!(
                "weight sum {} differs from scanned sum {scanned}",
                self.weight_sum
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(store: &WeightStore<&'static str>) -> Vec<&'static str> {
        store.iter().map(|e| e.category).collect()
    }

    #[test]
    fn new_category_is_pushed_ahead_of_equal_weights() {
        let mut store = WeightStore::new();
        store.upsert("a", 2.0);
        store.upsert("b", 1.0);
        store.upsert("c", 1.0);
        assert_eq!(categories(&store), vec!["a", "c", "b"]);
        store.check_invariants().unwrap();
    }

    #[test]
    fn boosted_category_moves_towards_head() {
        let mut store = WeightStore::new();
        for (c, w) in [("a", 5.0), ("b", 4.0), ("c", 3.0), ("d", 2.0)] {
            store.upsert(c, w);
        }
        assert_eq!(store.upsert("d", 4.0), Some(1));
        assert_eq!(categories(&store), vec!["a", "d", "b", "c"]);
        assert_eq!(store.rank(&"b"), Some(2));
        store.check_invariants().unwrap();
    }

    #[test]
    fn lowered_category_moves_towards_tail() {
        let mut store = WeightStore::new();
        for (c, w) in [("a", 5.0), ("b", 4.0), ("c", 3.0), ("d", 2.0)] {
            store.upsert(c, w);
        }
        assert_eq!(store.upsert("a", 2.0), Some(2));
        assert_eq!(categories(&store), vec!["b", "c", "a", "d"]);
        assert!((store.weight_sum() - 11.0).abs() < 1e-12);
        store.check_invariants().unwrap();
    }

    #[test]
    fn zero_weight_removes_category() {
        let mut store = WeightStore::new();
        store.upsert("a", 1.0);
        store.upsert("b", 2.0);
        assert_eq!(store.upsert("b", 0.0), None);
        assert!(!store.contains(&"b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.rank(&"a"), Some(0));
        store.check_invariants().unwrap();
    }

    #[test]
    fn invariants_reject_unusable_weights() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut store = WeightStore::new();
            store.upsert("a", 1.0);
            store.order[0].weight = bad;
            store.weight_sum = 1.0;
            assert!(store.check_invariants().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn remove_reindexes_suffix() {
        let mut store = WeightStore::new();
        for (c, w) in [("a", 4.0), ("b", 3.0), ("c", 2.0), ("d", 1.0)] {
            store.upsert(c, w);
        }
        assert_eq!(store.remove(&"b"), Some(3.0));
        assert_eq!(store.rank(&"c"), Some(1));
        assert_eq!(store.rank(&"d"), Some(2));
        assert_eq!(store.remove(&"zzz"), None);
        store.check_invariants().unwrap();
    }

    #[test]
    fn scale_drops_underflowed_tail() {
        let mut store = WeightStore::new();
        store.upsert("big", 1e300);
        store.upsert("tiny", 1e-300);
        store.scale(1e-100);
        assert_eq!(categories(&store), vec!["big"]);
        store.check_invariants().unwrap();
    }

    #[test]
    fn sum_survives_cancellation() {
        let mut store = WeightStore::new();
        store.upsert("small", 1.0);
        store.upsert("huge", 1e20);
        store.upsert("other", 3.0);
        store.remove(&"huge");
        assert_eq!(store.weight_sum(), 4.0);
        store.check_invariants().unwrap();
    }

    #[test]
    fn from_sorted_rejects_unsorted_and_duplicates() {
        let unsorted = vec![Entry::new("a", 1.0), Entry::new("b", 2.0)];
        assert!(matches!(
            WeightStore::from_sorted(unsorted),
            Err(DistributionError::InvalidDump { .. })
        ));

        let duplicated = vec![Entry::new("a", 2.0), Entry::new("a", 1.0)];
        assert!(WeightStore::from_sorted(duplicated).is_err());

        let negative = vec![Entry::new("a", -1.0)];
        assert!(matches!(
            WeightStore::from_sorted(negative),
            Err(DistributionError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn filtered_keeps_relative_order() {
        let mut store = WeightStore::new();
        for (c, w) in [("a", 1.0), ("b", 1.0), ("c", 3.0), ("d", 2.0)] {
            store.upsert(c, w);
        }
        let kept = store.filtered(|c| *c != "d");
        assert_eq!(categories(&kept), vec!["c", "b", "a"]);
        assert_eq!(kept.weight_sum(), 5.0);
        kept.check_invariants().unwrap();
    }

    #[test]
    fn from_unsorted_sorts_stably() {
        let store = WeightStore::from_unsorted(vec![
            Entry::new("x", 1.0),
            Entry::new("y", 3.0),
            Entry::new("z", 1.0),
            Entry::new("w", 0.0),
        ])
        .unwrap();
        assert_eq!(categories(&store), vec!["y", "x", "z"]);
        assert_eq!(store.weight_sum(), 5.0);
    }
}
