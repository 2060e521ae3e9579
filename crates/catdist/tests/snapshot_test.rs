use catdist::{CategoricalDistribution, CatdistConfig, DistributionError, Snapshot};
use serde_json::json;

fn learned() -> CategoricalDistribution<String> {
    let mut d = CategoricalDistribution::from_config(CatdistConfig::default().seeded(1)).unwrap();
    let words: Vec<String> = ["to", "be", "or", "not", "to", "be"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    d.learn(&words).unwrap();
    d
}

#[test]
fn dump_json_is_flat_and_ranked() {
    let d = learned();
    let value: serde_json::Value = serde_json::from_str(&d.dump_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!(["be", 2.0, "to", 2.0, "not", 1.0, "or", 1.0, null])
    );
}

#[test]
fn load_json_restores_ranking() {
    let d = learned();
    let mut restored: CategoricalDistribution<String> = CategoricalDistribution::new();
    restored.load_json(&d.dump_json().unwrap()).unwrap();

    assert_eq!(restored.dump(), d.dump());
    assert_eq!(restored.rank(&"not".to_string()), Some(2));
    restored.store().check_invariants().unwrap();
}

#[test]
fn load_keeps_policy_kind() {
    let mut d: CategoricalDistribution<char> = CategoricalDistribution::with_learning_rate(2.0).unwrap();
    d.learn(&['a', 'b']).unwrap();

    d.load_json(r#"["x", 3.0, "y", 1.0, 1.5]"#).unwrap();
    assert_eq!(d.learning_rate(), Some(1.5));
    assert_eq!(d.event_weight(), Some(1.0));
    assert_eq!(d.head(0), vec![&'x', &'y']);
}

#[test]
fn bounded_load_enforces_capacity() {
    let mut d: CategoricalDistribution<char> = CategoricalDistribution::with_capacity(10.0).unwrap();
    d.load_json(r#"["a", 6.0, "b", 2.0, 4.0]"#).unwrap();
    assert_eq!(d.capacity(), Some(4.0));
    assert!((d.weight_sum() - 4.0).abs() < 1e-12);
    assert!((d.prob(&'a') - 0.75).abs() < 1e-12);
}

#[test]
fn failed_load_leaves_state_unchanged() {
    let mut d = learned();
    let before = d.dump();

    assert_eq!(d.load_json(r#"{"be": 2}"#).unwrap_err(), DistributionError::NotAnArray);
    assert!(matches!(
        d.load_json(r#"["be", 2.0]"#),
        Err(DistributionError::InvalidDump { .. })
    ));
    assert!(matches!(
        d.load_json(r#"["be", 1.0, "to", 2.0, null]"#),
        Err(DistributionError::InvalidDump { .. })
    ));
    assert!(matches!(
        d.load_json(r#"["be", -1.0, null]"#),
        Err(DistributionError::InvalidWeight { .. })
    ));
    assert!(matches!(
        d.load_json(r#"["be", 1.0, -3.0]"#),
        Err(DistributionError::InvalidCapacity { .. })
    ));
    assert_eq!(d.dump(), before);
}

#[test]
fn zero_weights_are_dropped_on_load() {
    let mut d: CategoricalDistribution<String> = CategoricalDistribution::new();
    d.load(&Snapshot {
        entries: vec![("a".to_string(), 1.0), ("b".to_string(), 0.0)],
        policy: f64::INFINITY,
    })
    .unwrap();
    assert_eq!(d.num_categories(), 1);
}
