use catdist::{CategoricalDistribution, CatdistConfig, ForgettingStrategy};
use proptest::prelude::*;

fn arb_strategy() -> impl Strategy<Value = ForgettingStrategy> {
    prop_oneof![
        Just(ForgettingStrategy::Shrink),
        Just(ForgettingStrategy::SampledDecrement),
    ]
}

// ── Bounded mode never exceeds its capacity ──────────────────────────────

proptest! {
    #[test]
    fn capacity_is_never_exceeded(
        events in prop::collection::vec(0u8..20, 1..300),
        capacity in 1.0f64..50.0,
        strategy in arb_strategy(),
        seed in any::<u64>(),
    ) {
        let mut config = CatdistConfig::with_capacity(capacity).seeded(seed);
        config.policy.forgetting = strategy;
        let mut d: CategoricalDistribution<u8> = CategoricalDistribution::from_config(config).unwrap();
        for e in &events {
            d.learn_one(e).unwrap();
            prop_assert!(d.weight_sum() <= capacity * (1.0 + 1e-9));
        }
        prop_assert!(d.store().check_invariants().is_ok());
    }
}

// ── Unlearn reverses learn in recency mode ───────────────────────────────

proptest! {
    #[test]
    fn recency_unlearn_inverts_learn(
        history in prop::collection::vec(0u8..8, 0..50),
        batch in prop::collection::vec(0u8..8, 1..10),
        rate in 0.5f64..2.0,
        mass in 0.1f64..5.0,
    ) {
        let mut d: CategoricalDistribution<u8> = CategoricalDistribution::with_learning_rate(rate).unwrap();
        d.learn(&history).unwrap();
        let before = d.dist();
        let event_weight = d.event_weight().unwrap();

        d.learn_mass(&batch, mass).unwrap();
        d.unlearn_mass(&batch, mass).unwrap();

        let ew = d.event_weight().unwrap();
        prop_assert!((ew - event_weight).abs() <= 1e-9 * event_weight.max(1.0));
        for (c, p) in &before {
            prop_assert!((d.prob(c) - p).abs() < 1e-6, "{}: {} vs {}", c, d.prob(c), p);
        }
    }
}

// ── Rescaling preserves probabilities under huge rates ───────────────────

proptest! {
    #[test]
    fn huge_rates_stay_finite(
        events in prop::collection::vec(0u8..5, 1..200),
        exponent in 10i32..300,
    ) {
        let rate = 10f64.powi(exponent);
        let mut d: CategoricalDistribution<u8> = CategoricalDistribution::with_learning_rate(rate).unwrap();
        d.learn(&events).unwrap();

        prop_assert!(d.weight_sum().is_finite());
        prop_assert!(d.store().check_invariants().is_ok());
        let last = events[events.len() - 1];
        prop_assert_eq!(d.head(1), vec![&last]);
    }
}

// ── Long shrinking streams keep a usable event weight ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn long_recency_streams_keep_learning(
        length in 1500usize..4000,
        categories in 2u16..12,
        batch in prop::collection::vec(0u16..20, 1..8),
        rate in 0.1f64..1.0,
        mass in 0.1f64..5.0,
    ) {
        let mut d: CategoricalDistribution<u16> = CategoricalDistribution::with_learning_rate(rate).unwrap();
        for i in 0..length {
            d.learn_mass(&[i as u16 % categories], mass).unwrap();
        }
        let event_weight = d.event_weight().unwrap();
        prop_assert!(event_weight.is_normal() && event_weight > 0.0);
        prop_assert_eq!(d.num_categories(), categories as usize);

        let before = d.dist();
        let sum = d.weight_sum();
        d.learn_mass(&batch, mass).unwrap();
        for c in &batch {
            prop_assert!(d.rank(c).is_some(), "{} missing after learn", c);
        }
        prop_assert!(d.event_weight().unwrap() > 0.0);

        d.unlearn_mass(&batch, mass).unwrap();
        for (c, p) in &before {
            prop_assert!((d.prob(c) - p).abs() < 1e-6, "{}: {} vs {}", c, d.prob(c), p);
        }
        let ew = d.event_weight().unwrap();
        prop_assert!(ew >= f64::MIN_POSITIVE);
        // Rescaling may change the event weight but not its share of the sum.
        // Exact unless the batch pushed the recurrence onto its floor.
        let floor = f64::MIN_POSITIVE;
        if event_weight == floor || event_weight * rate.powi(batch.len() as i32) > 2.0 * floor {
            let rescaled = (ew / event_weight) / (d.weight_sum() / sum);
            prop_assert!((rescaled - 1.0).abs() <= 1e-9, "{} vs {}", ew, event_weight);
        }
        prop_assert!(d.store().check_invariants().is_ok());
    }
}
