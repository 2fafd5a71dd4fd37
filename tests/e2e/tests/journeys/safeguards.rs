//! Safeguard journeys
//!
//! Recall and reinforcement may push salience and affect past their bounds;
//! the safeguard pass pulls everything back and is a fixed point.

use xpunit_core::AffectState;
use xpunit_e2e_tests::{EnvironmentHarness, ScenarioFactory};

#[test]
fn test_runaway_unit_is_clamped() {
    let mut h = EnvironmentHarness::new();
    let id = ScenarioFactory::runaway_unit(&mut h, "collapse", 60);
    let max_salience = h.env.policies().max_salience;
    let max_magnitude = h.env.policies().max_affect_magnitude;

    assert!(h.unit(&id).salience > max_salience);
    assert!(h.unit(&id).affect.magnitude() > max_magnitude);

    let report = h.env.apply_runaway_affect_safeguards();
    assert!(report.changed());
    assert_eq!(report.salience_clamped, 1);
    assert_eq!(report.affect_clamped, 1);

    let unit = h.unit(&id);
    assert_eq!(unit.salience, max_salience);
    assert!(unit.affect.magnitude() <= max_magnitude + 1e-9);
    // Direction of the affect is preserved
    assert!(unit.affect.valence < 0.0);
    assert!((unit.affect.valence + unit.affect.arousal).abs() < 1e-9);
}

#[test]
fn test_safeguards_leave_healthy_state_alone() {
    let mut h = EnvironmentHarness::new();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 5);
    let before = h.env.snapshot();

    let report = h.env.apply_runaway_affect_safeguards();
    assert!(!report.changed());
    assert_eq!(report.units_checked, 5);
    assert_eq!(h.env.snapshot().units, before.units);
}

#[test]
fn test_safeguards_are_idempotent_after_mixed_workload() {
    let mut h = EnvironmentHarness::new();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    for i in 0..8 {
        let id = h.ingest(
            &format!("storm number {} tore the shutters", i),
            "storms",
            &format!("storm-{}", i),
            AffectState::new(-1.0, 1.0),
        );
        h.rehearse(&id, 25);
        h.env
            .reinforce_experience(&id, AffectState::new(-1.0, 1.0), None)
            .expect("unit exists");
    }

    // Sustained extremes drag the mood past the magnitude bound too
    assert!(h.env.mood_state().magnitude() > h.env.policies().max_affect_magnitude);

    let first = h.env.apply_runaway_affect_safeguards();
    assert!(first.changed());
    assert!(first.mood_clamped);
    let once = h.env.snapshot();

    let second = h.env.apply_runaway_affect_safeguards();
    assert!(!second.changed());
    let twice = h.env.snapshot();
    assert_eq!(once.units, twice.units);
    assert_eq!(once.mood_state, twice.mood_state);

    let stats = h.env.get_comprehensive_statistics();
    assert!(stats.max_salience <= h.env.policies().max_salience);
    assert!(h.violations().is_empty());
}

#[test]
fn test_reinforcement_stops_at_the_salience_bound() {
    let mut h = EnvironmentHarness::new();
    let id = h.ingest("a letter from an old friend", "mail", "friends", AffectState::new(0.2, 0.2));
    let max_salience = h.env.policies().max_salience;

    for i in 0..40 {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        h.env
            .reinforce_experience(&id, AffectState::new(sign, 1.0), None)
            .expect("unit exists");
        assert!(h.unit(&id).salience <= max_salience);
    }
    assert_eq!(h.unit(&id).salience, max_salience);
}
