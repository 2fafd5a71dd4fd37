//! Intrusion and flashbulb detour journeys
//!
//! A loud, off-topic memory interrupts a calm topic. The environment records
//! the intrusion, opens a flashbulb detour with a return path, keeps the
//! detour stack bounded and closes detours when their TTL runs out.

use xpunit_core::{LinkType, XpUnitPolicies};
use xpunit_e2e_tests::{EnvironmentHarness, ScenarioFactory};

/// Wide vectors keep cross-talk between unrelated lines far below the topicality threshold
fn harness() -> EnvironmentHarness {
    EnvironmentHarness::with_policies(XpUnitPolicies {
        dimension: 2048,
        ..XpUnitPolicies::default()
    })
}

#[test]
fn test_off_topic_emotional_memory_opens_detour() {
    let mut h = harness();
    let calm = ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    let anchor = calm.ids.last().cloned().expect("calm ids");

    let intruding = ScenarioFactory::intrusive_experience(&mut h, "work", "budget", 0);

    assert_eq!(h.env.total_intrusions(), 1);
    assert!(h.unit(&intruding).has_intrusion_link("budget"));
    let intrusion_links = h
        .unit(&intruding)
        .links
        .iter()
        .filter(|l| l.link_type == LinkType::Intrusion)
        .count();
    assert_eq!(intrusion_links, 1);

    let frame = h.env.detour_stack().last().cloned().expect("detour opened");
    assert_eq!(frame.intruding_id, intruding);
    assert_eq!(frame.topic_id, "budget");
    assert_eq!(frame.return_to, anchor);
    assert_eq!(frame.remaining_ttl, h.env.policies().return_path_ttl);

    let flashbulb = h.unit(&frame.flashbulb_id);
    assert!(flashbulb.is_flashbulb());
    assert_eq!(flashbulb.affect, ScenarioFactory::loud_affect());
    let return_path = flashbulb
        .links
        .iter()
        .find(|l| l.link_type == LinkType::ReturnPath)
        .expect("return path");
    assert_eq!(return_path.target_id, anchor);
    assert_eq!(return_path.ttl, Some(h.env.policies().return_path_ttl));
    assert!(flashbulb
        .links
        .iter()
        .any(|l| l.link_type == LinkType::Emotional));

    // The intruding unit still joins its thread and topic
    assert!(h.env.topic_buffer("budget").unwrap().contains(&intruding));
    assert_eq!(
        h.env.narrative_capsule("work").unwrap().last_capsule_id(),
        Some(intruding.as_str())
    );
    assert!(h.violations().is_empty());
}

#[test]
fn test_on_topic_emotional_memory_is_not_intrusive() {
    let mut h = harness();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    let loud = ScenarioFactory::on_topic_emotional(&mut h, "work", "budget");

    assert_eq!(h.env.total_intrusions(), 0);
    assert!(h.env.detour_stack().is_empty());
    assert!(!h.unit(&loud).has_intrusion_link("budget"));
}

#[test]
fn test_calm_off_topic_memory_is_not_intrusive() {
    let mut h = harness();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    let quiet = h.ingest(
        ScenarioFactory::intrusive_line(1),
        "work",
        "budget",
        ScenarioFactory::calm_affect(),
    );

    assert_eq!(h.env.total_intrusions(), 0);
    assert!(!h.unit(&quiet).has_intrusion_link("budget"));
}

#[test]
fn test_first_memory_of_a_topic_never_intrudes() {
    let mut h = harness();
    ScenarioFactory::intrusive_experience(&mut h, "night", "fresh-topic", 2);
    assert_eq!(h.env.total_intrusions(), 0);
    assert!(h.env.detour_stack().is_empty());
}

#[test]
fn test_detour_stack_is_bounded() {
    let mut h = EnvironmentHarness::with_policies(XpUnitPolicies {
        dimension: 2048,
        return_path_ttl: 50,
        max_intrusion_detours: 3,
        ..XpUnitPolicies::default()
    });
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);

    let count = ScenarioFactory::intrusive_line_count();
    let intruders: Vec<String> = (0..count)
        .map(|i| ScenarioFactory::intrusive_experience(&mut h, "work", "budget", i))
        .collect();

    // Every intrusion is recorded, only three open a detour
    assert_eq!(h.env.total_intrusions(), count as u64);
    for id in &intruders {
        assert!(h.unit(id).has_intrusion_link("budget"));
    }
    assert_eq!(h.env.detour_stack().len(), 3);
    assert_eq!(h.env.get_comprehensive_statistics().flashbulb_units, 3);
    let opened: Vec<&str> = h
        .env
        .detour_stack()
        .iter()
        .map(|f| f.intruding_id.as_str())
        .collect();
    assert_eq!(opened, intruders[..3].iter().map(String::as_str).collect::<Vec<_>>());

    // Direct engagement also respects the bound
    assert!(h.env.engage_detour(&intruders[4], "budget").is_none());
    assert!(h.violations().is_empty());
}

#[test]
fn test_short_ttl_caps_the_depth_reached_by_ingestion() {
    let mut h = harness();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    let natural = h.env.policies().natural_detour_depth();
    assert!(natural < h.env.policies().max_intrusion_detours);

    let mut deepest = 0;
    for i in 0..ScenarioFactory::intrusive_line_count() {
        ScenarioFactory::intrusive_experience(&mut h, "work", "budget", i);
        deepest = deepest.max(h.env.detour_stack().len());
    }
    assert_eq!(deepest, natural);
    assert!(h.violations().is_empty());
}

#[test]
fn test_detour_closes_after_ttl() {
    let mut h = harness();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
    ScenarioFactory::intrusive_experience(&mut h, "work", "budget", 0);
    let flashbulb_id = h.env.detour_stack()[0].flashbulb_id.clone();
    let ttl = h.env.policies().return_path_ttl as usize;

    for i in 0..ttl {
        assert_eq!(h.env.detour_stack().len(), 1, "closed early at step {}", i);
        h.ingest(
            &ScenarioFactory::calm_line("budget", 4 + i),
            "work",
            "budget",
            ScenarioFactory::calm_affect(),
        );
    }

    assert!(h.env.detour_stack().is_empty());
    let flashbulb = h.unit(&flashbulb_id);
    assert!(flashbulb
        .links
        .iter()
        .all(|l| l.link_type != LinkType::ReturnPath));
    assert!(flashbulb.is_flashbulb());
}

#[test]
fn test_resolve_detour_returns_to_topic() {
    let mut h = harness();
    let calm = ScenarioFactory::calm_thread(&mut h, "work", "budget", 3);
    ScenarioFactory::intrusive_experience(&mut h, "work", "budget", 3);

    let frame = h.env.resolve_detour().expect("open detour");
    assert_eq!(&frame.return_to, calm.ids.last().unwrap());
    assert!(h.env.detour_stack().is_empty());
    assert!(h.env.resolve_detour().is_none());
}

#[test]
fn test_engage_detour_directly() {
    let mut h = harness();
    let calm = ScenarioFactory::calm_thread(&mut h, "work", "budget", 3);
    let elsewhere = h.ingest(
        ScenarioFactory::intrusive_line(4),
        "night",
        "hospital",
        ScenarioFactory::loud_affect(),
    );

    let flashbulb = h
        .env
        .engage_detour(&elsewhere, "budget")
        .expect("detour opens");
    assert!(h.unit(&flashbulb).is_flashbulb());
    assert_eq!(&h.env.detour_stack()[0].return_to, calm.ids.last().unwrap());

    assert!(h.env.engage_detour("xp-unknown", "budget").is_none());
    assert_eq!(h.env.detour_stack().len(), 1);
}
