//! Consolidation workflow journeys
//!
//! Near-duplicate memories are gisted into one survivor; references follow
//! the survivor; units pinned by an open detour are left alone until the
//! detour closes.

use xpunit_core::{ConsolidationStage, XpUnitPolicies};
use xpunit_e2e_tests::{EnvironmentHarness, ScenarioFactory};

const DUPLICATE: &str = "ferry timetable changed for winter";

#[test]
fn test_duplicates_merge_and_references_follow() {
    let mut h = EnvironmentHarness::new();
    let calm = ScenarioFactory::calm_thread(&mut h, "travel", "commute", 3);
    let (first, second) = ScenarioFactory::duplicate_pair(&mut h, "travel", "commute", DUPLICATE);
    let before = h.env.len();

    let report = h.env.consolidate_memories(0.95);

    assert_eq!(report.units_merged, 1);
    assert_eq!(report.merges.len(), 1);
    assert_eq!(h.env.len(), before - 1);
    assert_eq!(h.env.total_consolidations(), 1);

    let merge = &report.merges[0];
    assert!(merge.survivor_id == first || merge.survivor_id == second);
    let absorbed = merge.absorbed_ids[0].clone();
    assert!(h.env.unit(&absorbed).is_none());

    let survivor = h.unit(&merge.survivor_id);
    assert_eq!(survivor.merged_from, vec![absorbed.clone()]);
    assert_eq!(survivor.text_trace.len(), 2);
    assert!(survivor.links.iter().all(|l| l.target_id != absorbed));

    // Calm lines are unrelated enough to stay apart
    for id in &calm.ids {
        assert!(h.env.unit(id).is_some());
    }

    let thread = h.env.narrative_capsule("travel").unwrap();
    assert!(!thread.linked_capsules.contains(&absorbed));
    assert!(thread.linked_capsules.contains(&merge.survivor_id));
    let topic = h.env.topic_buffer("commute").unwrap();
    assert!(!topic.contains(&absorbed));
    assert!(topic.contains(&merge.survivor_id));

    assert!(h.violations().is_empty());
}

#[test]
fn test_consolidation_reaches_a_fixed_point() {
    let mut h = EnvironmentHarness::new();
    for i in 0..4 {
        h.ingest(DUPLICATE, &format!("t{}", i), "commute", ScenarioFactory::calm_affect());
    }
    ScenarioFactory::calm_thread(&mut h, "travel", "commute", 3);

    let first = h.env.consolidate_memories(0.95);
    assert_eq!(first.units_merged, 3);
    assert_eq!(h.env.len(), 4);

    let second = h.env.consolidate_memories(0.95);
    assert_eq!(second.units_merged, 0);
    assert!(second.merges.is_empty());
    assert_eq!(h.env.total_consolidations(), 3);
}

#[test]
fn test_merged_rehearsals_advance_the_survivor() {
    let mut h = EnvironmentHarness::new();
    let (first, second) = ScenarioFactory::duplicate_pair(&mut h, "travel", "commute", DUPLICATE);
    let policies = h.env.policies().clone();
    h.rehearse(&first, policies.r1);
    h.rehearse(&second, policies.r2 - policies.r1 - 1);

    let report = h.env.consolidate_memories(0.95);
    let survivor_id = report.merges[0].survivor_id.clone();
    let survivor = h.unit(&survivor_id);
    assert_eq!(survivor.rehearsals, policies.r2 - 1);
    assert_eq!(survivor.consolidation, ConsolidationStage::Consolidating);

    // The next recall crosses r2 with the combined count
    let unit = h.recall(&survivor_id).unwrap();
    assert_eq!(unit.consolidation, ConsolidationStage::Consolidated);
}

#[test]
fn test_open_detour_pins_units_until_closed() {
    let mut h = EnvironmentHarness::with_policies(XpUnitPolicies {
        dimension: 2048,
        ..XpUnitPolicies::default()
    });
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    let intruding = ScenarioFactory::intrusive_experience(&mut h, "work", "budget", 0);
    // Same text, calm, in a topic of its own
    let copy = h.ingest(
        ScenarioFactory::intrusive_line(0),
        "night",
        "memories",
        ScenarioFactory::calm_affect(),
    );
    assert_eq!(h.env.detour_stack().len(), 1);

    let pinned = h.env.consolidate_memories(0.95);
    assert_eq!(pinned.units_merged, 0);
    assert!(pinned.units_pinned >= 2);
    assert!(h.env.unit(&intruding).is_some());
    assert!(h.env.unit(&copy).is_some());

    // One more ingestion exhausts the detour TTL
    h.ingest(
        &ScenarioFactory::calm_line("budget", 5),
        "work",
        "budget",
        ScenarioFactory::calm_affect(),
    );
    assert!(h.env.detour_stack().is_empty());

    let released = h.env.consolidate_memories(0.95);
    assert_eq!(released.units_merged, 1);
    let ids = [&intruding, &copy];
    let merge = &released.merges[0];
    assert!(ids.contains(&&merge.survivor_id));
    assert!(ids.contains(&&merge.absorbed_ids[0]));

    // The louder affect survives the merge
    let survivor = h.unit(&merge.survivor_id);
    assert_eq!(survivor.affect, ScenarioFactory::loud_affect());
    assert!(survivor.has_intrusion_link("budget"));
    assert!(h.violations().is_empty());
}

#[test]
fn test_nan_threshold_is_a_no_op() {
    let mut h = EnvironmentHarness::new();
    ScenarioFactory::duplicate_pair(&mut h, "travel", "commute", DUPLICATE);
    let report = h.env.consolidate_memories(f64::NAN);
    assert_eq!(report.units_merged, 0);
    assert_eq!(h.env.len(), 2);
}
