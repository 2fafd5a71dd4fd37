//! Ingest and recall journeys
//!
//! Threads, topics, rehearsal-driven consolidation stages, retention and
//! cue search over a populated environment.

use xpunit_core::{AffectState, ConsolidationStage, LinkType};
use xpunit_e2e_tests::{EnvironmentHarness, ScenarioFactory};

#[test]
fn test_thread_and_topic_tracking() {
    let mut h = EnvironmentHarness::new();
    let scenario = ScenarioFactory::calm_thread(&mut h, "work", "budget", 5);

    let thread = h.env.narrative_capsule("work").expect("thread exists");
    assert_eq!(thread.linked_capsules, scenario.ids);
    assert_eq!(thread.text_trace.len(), 5);

    let topic = h.env.topic_buffer("budget").expect("topic exists");
    assert_eq!(topic.len(), 5);
    assert_eq!(topic.last_capsule_id.as_deref(), scenario.ids.last().map(String::as_str));

    // Each unit after the first links back to its predecessor
    for pair in scenario.ids.windows(2) {
        let unit = h.unit(&pair[1]);
        let narrative: Vec<_> = unit
            .links
            .iter()
            .filter(|l| l.link_type == LinkType::Narrative)
            .collect();
        assert_eq!(narrative.len(), 1);
        assert_eq!(narrative[0].target_id, pair[0]);
    }
    assert!(h.unit(&scenario.ids[0]).links.is_empty());

    assert_eq!(h.env.total_ingestions(), 5);
    assert_eq!(h.env.total_intrusions(), 0);
    assert!(h.violations().is_empty());
}

#[test]
fn test_rehearsal_walks_the_lifecycle() {
    let mut h = EnvironmentHarness::new();
    let id = h.ingest("learned the harbor tide tables", "study", "sailing", AffectState::neutral());
    let policies = h.env.policies().clone();

    let mut previous = ConsolidationStage::Episodic;
    for recall in 1..=policies.r3 + 2 {
        h.advance_hours(6);
        let unit = h.recall(&id).expect("unit exists");
        assert_eq!(unit.rehearsals, recall);
        assert!(unit.consolidation >= previous, "stage moved backward");
        previous = unit.consolidation;

        let expected = ConsolidationStage::from_rehearsals(recall, &policies);
        assert_eq!(unit.consolidation, expected);
    }
    assert_eq!(previous, ConsolidationStage::Remote);
    assert_eq!(h.unit(&id).last_recall, Some(h.now()));
}

#[test]
fn test_recall_unknown_id_is_none() {
    let mut h = EnvironmentHarness::new();
    ScenarioFactory::calm_thread(&mut h, "work", "budget", 2);
    assert!(h.recall("xp-does-not-exist").is_none());
    assert_eq!(h.env.len(), 2);
}

#[test]
fn test_emotional_memories_decay_slower() {
    let mut h = EnvironmentHarness::new();
    let calm = h.ingest("quiet walk along the canal", "diary", "walks", ScenarioFactory::calm_affect());
    let vivid = h.ingest(
        "lightning split the oak beside me",
        "diary",
        "storms",
        AffectState::new(-0.8, 1.0),
    );

    let half_life = h.env.policies().decay_half_life_hours as i64;
    h.advance_hours(half_life);

    let calm_retention = h.retention(&calm);
    let vivid_retention = h.retention(&vivid);
    assert!(calm_retention > 0.49 && calm_retention < 0.6, "calm {}", calm_retention);
    assert!(vivid_retention > calm_retention);

    // Rehearsal resets the clock and stretches the half-life
    let r1 = h.env.policies().r1;
    h.rehearse(&calm, r1);
    assert_eq!(h.unit(&calm).consolidation, ConsolidationStage::Consolidating);
    h.advance_hours(half_life);
    assert!(h.retention(&calm) > calm_retention);
}

#[test]
fn test_cue_search_prefers_matching_topic() {
    let mut h = EnvironmentHarness::new();
    let garden = ScenarioFactory::calm_thread(&mut h, "home", "garden", 4);
    ScenarioFactory::calm_thread(&mut h, "sky", "telescope", 4);

    let hits = h.search("garden", 3);
    assert!(!hits.is_empty());
    assert!(garden.ids.contains(&hits[0].content_id));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    // Search is read-only
    for id in &garden.ids {
        assert_eq!(h.unit(id).rehearsals, 0);
    }
}

#[test]
fn test_appending_evidence_grows_the_trace() {
    let mut h = EnvironmentHarness::new();
    let id = h.ingest("the boiler makes a knocking sound", "house", "repairs", AffectState::neutral());
    let before = h.unit(&id).reliability;

    let appended = h
        .env
        .append_evidence(&id, "plumber confirmed the boiler knocking", &[])
        .expect("dimensions match");
    assert!(appended);

    let unit = h.unit(&id);
    assert_eq!(unit.text_trace.len(), 2);
    assert!(unit.reliability > before);
    assert_eq!(unit.content, "plumber confirmed the boiler knocking");

    let missing = h.env.append_evidence("xp-missing", "nothing", &[]).expect("no error");
    assert!(!missing);
}

#[test]
fn test_mood_follows_sustained_affect() {
    let mut h = EnvironmentHarness::new();
    // A fresh topic per line: nothing can intrude on a topic with no history
    for i in 0..12 {
        h.ingest(
            &ScenarioFactory::calm_line("holiday", i),
            "trip",
            &format!("holiday-{}", i),
            AffectState::new(0.9, 0.6),
        );
    }
    let mood = h.env.mood_state();
    assert!(mood.valence > 0.8, "mood valence {}", mood.valence);
    assert_eq!(h.env.total_intrusions(), 0);

    // Mood-congruent reinforcement moves a unit further than incongruent
    let happy = h.ingest("birthday cake on the terrace", "trip", "party", AffectState::new(0.3, 0.3));
    let sad = h.ingest("missed the last ferry home", "trip", "ferry", AffectState::new(-0.3, 0.3));
    let congruent = h
        .env
        .reinforce_experience(&happy, AffectState::new(0.8, 0.5), Some(&sad))
        .expect("unit exists");
    let incongruent = h
        .env
        .reinforce_experience(&sad, AffectState::new(-0.8, 0.5), None)
        .expect("unit exists");
    assert!(congruent.eta > incongruent.eta);
    assert!(h
        .unit(&happy)
        .links
        .iter()
        .any(|l| l.link_type == LinkType::Emotional && l.target_id == sad));
}
