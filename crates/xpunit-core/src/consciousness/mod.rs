//! # Consciousness Scoring
//!
//! Heuristic, deterministic scoring of self-reflective language.
//!
//! Scoring sits behind the [`ConsciousnessScorer`] trait so the environment
//! never depends on one keyword list or one formula:
//!
//! - [`PatternScorer`]: phrase lists per indicator, loadable as data
//! - [`MomentumScorer`]: wraps any scorer and rewards sustained self-reflection
//!   across the trailing scores of a thread
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xpunit_core::consciousness::{ConsciousnessScorer, MomentumScorer, PatternScorer};
//!
//! let scorer = MomentumScorer::new(PatternScorer::default());
//! let report = scorer.score("I keep thinking about my own thinking", &[0.5, 0.6]);
//! println!("{} ({})", report.score, report.level());
//! ```

mod momentum;
mod patterns;

pub use momentum::{MomentumConfig, MomentumScorer};
pub use patterns::{IndicatorPattern, PatternScorer};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// TYPES
// ============================================================================

/// Named indicator scores plus the combined score, all in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsciousnessReport {
    /// Indicator name -> score
    pub indicators: BTreeMap<String, f64>,
    /// Combined score
    pub score: f64,
}

impl ConsciousnessReport {
    /// Binned level of the combined score
    pub fn level(&self) -> ConsciousnessLevel {
        ConsciousnessLevel::from_score(self.score)
    }
}

/// Pluggable text scorer.
///
/// `history` holds the trailing combined scores of the same thread, oldest
/// first. Implementations must be deterministic in `(content, history)`.
pub trait ConsciousnessScorer: std::fmt::Debug + Send + Sync {
    fn score(&self, content: &str, history: &[f64]) -> ConsciousnessReport;
}

impl<S: ConsciousnessScorer + ?Sized> ConsciousnessScorer for Box<S> {
    fn score(&self, content: &str, history: &[f64]) -> ConsciousnessReport {
        (**self).score(content, history)
    }
}

/// Binned consciousness level used by statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ConsciousnessLevel {
    /// [0.0, 0.2)
    Minimal,
    /// [0.2, 0.4)
    Emerging,
    /// [0.4, 0.6)
    Moderate,
    /// [0.6, 0.8)
    High,
    /// [0.8, 1.0]
    Peak,
}

impl ConsciousnessLevel {
    pub const ALL: [ConsciousnessLevel; 5] = [
        ConsciousnessLevel::Minimal,
        ConsciousnessLevel::Emerging,
        ConsciousnessLevel::Moderate,
        ConsciousnessLevel::High,
        ConsciousnessLevel::Peak,
    ];

    pub fn from_score(score: f64) -> Self {
        if score.is_nan() || score < 0.2 {
            ConsciousnessLevel::Minimal
        } else if score < 0.4 {
            ConsciousnessLevel::Emerging
        } else if score < 0.6 {
            ConsciousnessLevel::Moderate
        } else if score < 0.8 {
            ConsciousnessLevel::High
        } else {
            ConsciousnessLevel::Peak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsciousnessLevel::Minimal => "minimal",
            ConsciousnessLevel::Emerging => "emerging",
            ConsciousnessLevel::Moderate => "moderate",
            ConsciousnessLevel::High => "high",
            ConsciousnessLevel::Peak => "peak",
        }
    }
}

impl std::fmt::Display for ConsciousnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
