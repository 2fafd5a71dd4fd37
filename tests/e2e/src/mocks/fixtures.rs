//! Scenario Factory
//!
//! Canned experiences with controlled vocabulary and affect:
//! - Calm threads that share exactly one topic word per line
//! - Emotionally loud lines whose words appear nowhere else
//! - Exact duplicates for consolidation
//! - Runaway units for the safeguard pass

use std::collections::HashMap;

use xpunit_core::AffectState;

use crate::harness::EnvironmentHarness;

/// Calm lines; `{}` is replaced by the topic word
const CALM_LINES: &[&str] = &[
    "{} checklist reviewed before lunch",
    "sorted receipts into the {} folder",
    "{} meeting moved to thursday afternoon",
    "drafted notes summarizing {} progress",
    "called supplier regarding {} delivery",
    "{} figures reconciled against ledger",
    "printed fresh copies of {} schedule",
    "answered questions about {} deadlines",
];

/// Loud lines sharing no content word with each other or with `CALM_LINES`
const INTRUSIVE_LINES: &[&str] = &[
    "sirens wailing after the highway crash",
    "funeral rain and black umbrellas",
    "flames climbing warehouse roof at midnight",
    "dog lunging with a torn sleeve",
    "hospital corridor smell during surgery",
    "screaming passengers when turbulence hit",
];

/// Factory for journey test data
///
/// # Example
///
/// ```rust,ignore
/// let mut h = EnvironmentHarness::new();
/// let calm = ScenarioFactory::calm_thread(&mut h, "work", "budget", 4);
/// let loud = ScenarioFactory::intrusive_experience(&mut h, "work", "budget", 0);
/// ```
pub struct ScenarioFactory;

/// Ids created by a scenario
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Ids in ingestion order
    pub ids: Vec<String>,
    pub description: String,
    /// Metadata for assertions
    pub metadata: HashMap<String, String>,
}

impl ScenarioFactory {
    /// Affect of calm lines; far below the intrusion threshold
    pub fn calm_affect() -> AffectState {
        AffectState::new(0.1, 0.2)
    }

    /// Affect of loud lines; well above the intrusion threshold
    pub fn loud_affect() -> AffectState {
        AffectState::new(-0.9, 0.9)
    }

    /// Text of calm line `index` for `topic`
    pub fn calm_line(topic: &str, index: usize) -> String {
        CALM_LINES[index % CALM_LINES.len()].replace("{}", topic)
    }

    /// Text of intrusive line `index`
    pub fn intrusive_line(index: usize) -> &'static str {
        INTRUSIVE_LINES[index % INTRUSIVE_LINES.len()]
    }

    /// Number of distinct intrusive lines
    pub fn intrusive_line_count() -> usize {
        INTRUSIVE_LINES.len()
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// `count` calm, on-topic experiences in one thread
    pub fn calm_thread(
        h: &mut EnvironmentHarness,
        thread: &str,
        topic: &str,
        count: usize,
    ) -> Scenario {
        let ids = (0..count)
            .map(|i| h.ingest(&Self::calm_line(topic, i), thread, topic, Self::calm_affect()))
            .collect();

        let mut metadata = HashMap::new();
        metadata.insert("thread".to_string(), thread.to_string());
        metadata.insert("topic".to_string(), topic.to_string());

        Scenario {
            ids,
            description: format!("{} calm lines about {}", count, topic),
            metadata,
        }
    }

    /// One loud, off-topic experience
    pub fn intrusive_experience(
        h: &mut EnvironmentHarness,
        thread: &str,
        topic: &str,
        index: usize,
    ) -> String {
        h.ingest(Self::intrusive_line(index), thread, topic, Self::loud_affect())
    }

    /// Loud experience built from the topic's own vocabulary
    pub fn on_topic_emotional(h: &mut EnvironmentHarness, thread: &str, topic: &str) -> String {
        let text = format!("{} {} {}", topic, topic, Self::calm_line(topic, 0));
        h.ingest(&text, thread, topic, Self::loud_affect())
    }

    /// Two experiences with identical text
    pub fn duplicate_pair(
        h: &mut EnvironmentHarness,
        thread: &str,
        topic: &str,
        text: &str,
    ) -> (String, String) {
        let first = h.ingest(text, thread, topic, Self::calm_affect());
        let second = h.ingest(text, thread, topic, Self::calm_affect());
        (first, second)
    }

    /// An extreme experience recalled far past the salience bound
    pub fn runaway_unit(h: &mut EnvironmentHarness, topic: &str, recalls: u32) -> String {
        let id = h.ingest(
            "everything collapsing at once",
            "runaway",
            topic,
            AffectState::new(-1.0, 1.0),
        );
        h.rehearse(&id, recalls);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use xpunit_core::hrr::tokenize;

    #[test]
    fn test_intrusive_vocabulary_is_disjoint() {
        let calm: HashSet<String> = CALM_LINES.iter().flat_map(|l| tokenize(l)).collect();
        let mut seen = HashSet::new();
        for line in INTRUSIVE_LINES {
            for word in tokenize(line) {
                assert!(!calm.contains(&word), "{} appears in calm lines", word);
                assert!(seen.insert(word.clone()), "{} repeats across intrusive lines", word);
            }
        }
    }

    #[test]
    fn test_calm_lines_share_only_the_topic() {
        let words: Vec<HashSet<String>> = (0..CALM_LINES.len())
            .map(|i| tokenize(&ScenarioFactory::calm_line("budget", i)).into_iter().collect())
            .collect();
        for (i, a) in words.iter().enumerate() {
            for b in words.iter().skip(i + 1) {
                let shared: Vec<_> = a.intersection(b).collect();
                assert_eq!(shared, vec!["budget"]);
            }
        }
    }
}
