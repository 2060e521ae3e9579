use catdist::{CategoricalDistribution, CatdistConfig, WeightStore};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Upsert(u8, f64),
    Add(u8, f64),
    Remove(u8),
    Scale(f64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..16, 0.0f64..100.0).prop_map(|(c, w)| Op::Upsert(c, w)),
        (0u8..16, -50.0f64..50.0).prop_map(|(c, d)| Op::Add(c, d)),
        (0u8..16).prop_map(Op::Remove),
        (0.01f64..10.0).prop_map(Op::Scale),
    ]
}

// ── Ranking, index and sum stay consistent ───────────────────────────────

proptest! {
    #[test]
    fn store_invariants_hold(ops in prop::collection::vec(arb_op(), 0..200)) {
        let mut store = WeightStore::new();
        for op in ops {
            match op {
                Op::Upsert(c, w) => { store.upsert(c, w); }
                Op::Add(c, d) => { store.add(&c, d); }
                Op::Remove(c) => { store.remove(&c); }
                Op::Scale(f) => store.scale(f),
            }
            prop_assert!(store.check_invariants().is_ok(), "{:?}", store.check_invariants());
        }
    }
}

// ── Probabilities form a distribution ────────────────────────────────────

proptest! {
    #[test]
    fn probabilities_sum_to_one(
        events in prop::collection::vec(0u8..30, 1..300),
        rate in 0.5f64..2.0,
    ) {
        let mut d: CategoricalDistribution<u8> = CategoricalDistribution::with_learning_rate(rate).unwrap();
        d.learn(&events).unwrap();
        let total: f64 = d.map(|_, p, _| p).iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "sum was {}", total);
    }
}

// ── Learning one category never lowers its rank ──────────────────────────

proptest! {
    #[test]
    fn learning_never_demotes(
        events in prop::collection::vec(0u8..10, 1..100),
        target in 0u8..10,
    ) {
        let mut d: CategoricalDistribution<u8> =
            CategoricalDistribution::from_config(CatdistConfig::default().seeded(0)).unwrap();
        d.learn(&events).unwrap();
        let before = d.rank(&target).unwrap_or(usize::MAX);
        d.learn_one(&target).unwrap();
        let after = d.rank(&target).unwrap();
        prop_assert!(after <= before);
    }
}

// ── Snapshots round-trip ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn dump_load_preserves_ranking(events in prop::collection::vec(0u16..500, 0..200)) {
        let mut d: CategoricalDistribution<u16> =
            CategoricalDistribution::from_config(CatdistConfig::default().seeded(1)).unwrap();
        d.learn(&events).unwrap();

        let mut restored: CategoricalDistribution<u16> = CategoricalDistribution::new();
        restored.load_json(&d.dump_json().unwrap()).unwrap();
        prop_assert_eq!(restored.dump(), d.dump());
    }
}
