//! Lexicon-based affect appraisal
//!
//! Derives an [`AffectState`] from raw text when the caller does not supply
//! one. Word-level lexicon with a short negation window, plus an arousal bump
//! for exclamation marks. Deterministic: the same text always appraises to the
//! same affect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AffectState;

/// Words that flip valence when they occur shortly before a lexicon hit
const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "won't", "can't", "couldn't",
    "shouldn't", "without", "hardly", "isn't", "wasn't",
];

/// How many tokens before a hit are searched for a negation
const NEGATION_WINDOW: usize = 3;

/// Valence damping applied to negated words
const NEGATION_DAMPING: f64 = 0.7;

/// Arousal added per exclamation mark, and its cap
const EXCLAMATION_AROUSAL: f64 = 0.05;
const EXCLAMATION_AROUSAL_CAP: f64 = 0.2;

/// Result of appraising a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalResult {
    /// The derived affect
    pub affect: AffectState,
    /// Lexicon words that contributed
    pub contributing_words: Vec<String>,
    /// Fraction of tokens that hit the lexicon, in [0, 1]
    pub coverage: f64,
}

/// Maps text to affect using a (valence, arousal) lexicon.
#[derive(Debug, Clone)]
pub struct AffectAppraiser {
    lexicon: HashMap<String, (f64, f64)>,
}

impl Default for AffectAppraiser {
    fn default() -> Self {
        Self::new()
    }
}

impl AffectAppraiser {
    /// Create an appraiser with the built-in lexicon
    pub fn new() -> Self {
        Self {
            lexicon: Self::build_lexicon(),
        }
    }

    /// Create an appraiser with a caller-supplied lexicon (word -> (valence, arousal))
    pub fn with_lexicon(lexicon: HashMap<String, (f64, f64)>) -> Self {
        Self {
            lexicon: lexicon
                .into_iter()
                .map(|(word, (v, a))| (word.to_lowercase(), (v, a)))
                .collect(),
        }
    }

    /// Number of words in the lexicon
    pub fn lexicon_size(&self) -> usize {
        self.lexicon.len()
    }

    /// Appraise text and return only the affect.
    pub fn appraise(&self, content: &str) -> AffectState {
        self.evaluate(content).affect
    }

    /// Appraise text with contributing words and coverage.
    pub fn evaluate(&self, content: &str) -> AppraisalResult {
        let words: Vec<String> = content
            .to_lowercase()
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                    .to_string()
            })
            .filter(|w| !w.is_empty())
            .collect();

        let mut total_valence = 0.0;
        let mut total_arousal = 0.0;
        let mut contributing = Vec::new();
        let mut hit_count = 0usize;

        for (i, word) in words.iter().enumerate() {
            if let Some(&(valence, arousal)) = self.lexicon.get(word.as_str()) {
                let negated = (i.saturating_sub(NEGATION_WINDOW)..i)
                    .any(|j| NEGATION_WORDS.contains(&words[j].as_str()));

                total_valence += if negated {
                    -valence * NEGATION_DAMPING
                } else {
                    valence
                };
                total_arousal += arousal;
                contributing.push(word.clone());
                hit_count += 1;
            }
        }

        let exclamations = content.chars().filter(|c| *c == '!').count() as f64;
        let exclamation_boost = (exclamations * EXCLAMATION_AROUSAL).min(EXCLAMATION_AROUSAL_CAP);

        let affect = if hit_count > 0 {
            AffectState::new(
                total_valence / hit_count as f64,
                total_arousal / hit_count as f64 + exclamation_boost,
            )
        } else {
            AffectState::new(0.0, exclamation_boost)
        };

        let coverage = if words.is_empty() {
            0.0
        } else {
            (hit_count as f64 / words.len() as f64).min(1.0)
        };

        AppraisalResult {
            affect,
            contributing_words: contributing,
            coverage,
        }
    }

    /// Build the default lexicon (word -> (valence, arousal))
    fn build_lexicon() -> HashMap<String, (f64, f64)> {
        let mut lex = HashMap::new();

        // Positive / Low arousal
        for (word, v, a) in [
            ("calm", 0.4, 0.1), ("peaceful", 0.5, 0.1), ("serene", 0.5, 0.1),
            ("gentle", 0.4, 0.1), ("relaxed", 0.5, 0.1), ("safe", 0.5, 0.2),
            ("grateful", 0.7, 0.3), ("thankful", 0.7, 0.3), ("comfortable", 0.5, 0.2),
            ("good", 0.5, 0.3), ("nice", 0.5, 0.2), ("warm", 0.5, 0.3),
        ] {
            lex.insert(word.to_string(), (v, a));
        }

        // Positive / High arousal
        for (word, v, a) in [
            ("happy", 0.7, 0.5), ("joy", 0.8, 0.6), ("love", 0.8, 0.7),
            ("loved", 0.8, 0.6), ("excited", 0.7, 0.8), ("thrilled", 0.8, 0.9),
            ("amazing", 0.9, 0.8), ("wonderful", 0.8, 0.6), ("proud", 0.7, 0.6),
            ("delighted", 0.8, 0.7), ("fantastic", 0.9, 0.8), ("hope", 0.5, 0.4),
            ("hopeful", 0.6, 0.4), ("inspired", 0.7, 0.7), ("breakthrough", 0.9, 0.9),
            ("success", 0.7, 0.6), ("celebrate", 0.8, 0.8),
        ] {
            lex.insert(word.to_string(), (v, a));
        }

        // Negative / Low arousal
        for (word, v, a) in [
            ("sad", -0.6, 0.3), ("lonely", -0.6, 0.3), ("tired", -0.3, 0.2),
            ("bored", -0.3, 0.1), ("empty", -0.5, 0.2), ("miss", -0.4, 0.4),
            ("missed", -0.4, 0.4), ("regret", -0.5, 0.4), ("disappointed", -0.5, 0.4),
            ("gloomy", -0.5, 0.2), ("lost", -0.5, 0.4), ("hurt", -0.6, 0.5),
        ] {
            lex.insert(word.to_string(), (v, a));
        }

        // Negative / High arousal
        for (word, v, a) in [
            ("afraid", -0.7, 0.7), ("scared", -0.7, 0.8), ("terrified", -0.9, 0.9),
            ("panic", -0.8, 0.9), ("angry", -0.7, 0.8), ("furious", -0.8, 0.9),
            ("anxious", -0.6, 0.7), ("worried", -0.5, 0.6), ("grief", -0.9, 0.7),
            ("death", -0.9, 0.7), ("died", -0.9, 0.8), ("funeral", -0.8, 0.6),
            ("accident", -0.7, 0.8), ("crash", -0.8, 0.9), ("hospital", -0.5, 0.6),
            ("horrible", -0.8, 0.7), ("awful", -0.7, 0.6), ("hate", -0.8, 0.8),
            ("shocked", -0.3, 0.9), ("devastated", -0.9, 0.8), ("betrayed", -0.8, 0.8),
            ("trauma", -0.9, 0.8), ("nightmare", -0.8, 0.8), ("screaming", -0.6, 0.9),
        ] {
            lex.insert(word.to_string(), (v, a));
        }

        // Surprise / Discovery
        for (word, v, a) in [
            ("unexpected", 0.0, 0.7), ("surprised", 0.1, 0.7), ("strange", -0.1, 0.6),
            ("weird", -0.2, 0.5), ("curious", 0.3, 0.5), ("interesting", 0.4, 0.6),
            ("realized", 0.4, 0.6), ("wonder", 0.4, 0.5),
        ] {
            lex.insert(word.to_string(), (v, a));
        }

        lex
    }
}

// ============================================================================
// TESTS
// ============================================================================
