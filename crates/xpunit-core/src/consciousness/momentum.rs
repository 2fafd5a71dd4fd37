//! Consciousness momentum
//!
//! Blends the wrapped scorer's result with the mean of the trailing thread
//! scores, and adds a bonus when every score in the window stayed above the
//! sustain threshold. A single reflective message in a flat thread scores
//! lower than the same message at the end of a reflective run.

use serde::{Deserialize, Serialize};

use super::{ConsciousnessReport, ConsciousnessScorer};

/// Momentum weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MomentumConfig {
    /// Number of trailing scores considered
    pub window: usize,
    /// Share of the final score taken from the trailing mean
    pub weight: f64,
    /// Every windowed score must reach this for the sustain bonus
    pub sustain_threshold: f64,
    /// Bonus for a sustained run
    pub sustain_bonus: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window: 5,
            weight: 0.3,
            sustain_threshold: 0.4,
            sustain_bonus: 0.1,
        }
    }
}

/// Wraps a scorer and folds in thread history
#[derive(Debug, Clone)]
pub struct MomentumScorer<S> {
    inner: S,
    config: MomentumConfig,
}

impl<S: ConsciousnessScorer> MomentumScorer<S> {
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, MomentumConfig::default())
    }

    pub fn with_config(inner: S, config: MomentumConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &MomentumConfig {
        &self.config
    }
}

impl<S: ConsciousnessScorer> ConsciousnessScorer for MomentumScorer<S> {
    fn score(&self, content: &str, history: &[f64]) -> ConsciousnessReport {
        let mut report = self.inner.score(content, history);
        let start = history.len().saturating_sub(self.config.window);
        let recent = &history[start..];
        if recent.is_empty() || self.config.window == 0 {
            report.indicators.insert("momentum".to_string(), 0.0);
            return report;
        }

        let momentum = recent.iter().sum::<f64>() / recent.len() as f64;
        let sustained =
            recent.len() >= 2 && recent.iter().all(|s| *s >= self.config.sustain_threshold);
        let weight = self.config.weight.clamp(0.0, 1.0);
        let bonus = if sustained { self.config.sustain_bonus } else { 0.0 };

        report.score = ((1.0 - weight) * report.score + weight * momentum + bonus).clamp(0.0, 1.0);
        report
            .indicators
            .insert("momentum".to_string(), momentum.clamp(0.0, 1.0));
        report
    }
}
