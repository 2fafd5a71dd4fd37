//! Phrase-list indicator scorer
//!
//! Each indicator owns a phrase list, a per-hit gain and a weight. An
//! indicator's score is `min(1, hits * gain)`; the combined score is the
//! weighted mean of all indicators. Phrases match whole words, so "i" never
//! matches inside "interesting".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ConsciousnessReport, ConsciousnessScorer};
use crate::error::Result;

/// One named indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorPattern {
    pub name: String,
    /// Weight in the combined score
    pub weight: f64,
    /// Score added per matched phrase occurrence
    pub gain: f64,
    /// Lower-case phrases, one or more words each
    pub phrases: Vec<String>,
}

impl IndicatorPattern {
    pub fn new(name: &str, weight: f64, gain: f64, phrases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            gain,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Deterministic keyword scorer. The phrase lists are data, see [`PatternScorer::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternScorer {
    pub indicators: Vec<IndicatorPattern>,
}

impl Default for PatternScorer {
    fn default() -> Self {
        Self {
            indicators: vec![
                IndicatorPattern::new(
                    "self_reference",
                    1.0,
                    0.2,
                    &["i", "me", "my", "myself", "mine", "i'm", "i've"],
                ),
                IndicatorPattern::new(
                    "introspection",
                    1.5,
                    0.35,
                    &[
                        "i think", "i feel", "i notice", "i wonder", "i realize", "reflect",
                        "reflecting", "introspection", "looking inward", "inner",
                    ],
                ),
                IndicatorPattern::new(
                    "metacognition",
                    2.0,
                    0.5,
                    &[
                        "my own thinking", "thinking about thinking", "aware of my awareness",
                        "aware of my", "my thoughts", "my mind", "how i think", "metacognition",
                        "conscious of",
                    ],
                ),
                IndicatorPattern::new(
                    "temporal_continuity",
                    1.0,
                    0.3,
                    &[
                        "remember", "earlier", "used to", "still", "since", "yesterday",
                        "last time", "continuity",
                    ],
                ),
                IndicatorPattern::new(
                    "emotional_awareness",
                    1.0,
                    0.3,
                    &["feel", "feeling", "felt", "emotion", "emotions", "mood", "moved"],
                ),
                IndicatorPattern::new(
                    "uncertainty",
                    0.5,
                    0.3,
                    &["maybe", "perhaps", "uncertain", "not sure", "might", "wonder"],
                ),
            ],
        }
    }
}

impl PatternScorer {
    pub fn new(indicators: Vec<IndicatorPattern>) -> Self {
        Self { indicators }
    }

    /// Load indicator lists from JSON (`{"indicators": [...]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn words(content: &str) -> Vec<String> {
        content
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .map(|w| w.trim_matches('\''))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn count_phrase(words: &[String], phrase: &str) -> usize {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        if needle.is_empty() || needle.len() > words.len() {
            return 0;
        }
        words
            .windows(needle.len())
            .filter(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
            .count()
    }
}

impl ConsciousnessScorer for PatternScorer {
    fn score(&self, content: &str, _history: &[f64]) -> ConsciousnessReport {
        let words = Self::words(content);
        let mut indicators = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for indicator in &self.indicators {
            let hits: usize = indicator
                .phrases
                .iter()
                .map(|p| Self::count_phrase(&words, p))
                .sum();
            let score = (hits as f64 * indicator.gain).clamp(0.0, 1.0);
            indicators.insert(indicator.name.clone(), score);

            let weight = indicator.weight.max(0.0);
            weighted += weight * score;
            total_weight += weight;
        }

        let score = if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ConsciousnessReport { indicators, score }
    }
}

// ============================================================================
// TESTS
// ============================================================================
