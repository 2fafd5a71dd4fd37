//! Read-only aggregate views of an environment

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AdvancedXpEnvironment;
use crate::affect::AffectState;
use crate::consciousness::ConsciousnessLevel;
use crate::memory::ConsolidationStage;

/// Summary consumed by dashboards and analysis scripts
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatistics {
    pub total_units: usize,
    /// Of which flashbulb detour capsules
    pub flashbulb_units: usize,
    /// Units per consciousness level (every level present, possibly 0)
    pub consciousness_distribution: BTreeMap<String, usize>,
    pub mean_consciousness: f64,
    /// Mean of `affect.magnitude()`
    pub affect_magnitude_mean: f64,
    /// Population variance of `affect.magnitude()`
    pub affect_magnitude_variance: f64,
    pub mean_valence: f64,
    pub mean_arousal: f64,
    pub mood_state: AffectState,
    /// Topic buffers with at least one member
    pub active_topic_buffers: usize,
    pub narrative_capsules: usize,
    pub total_intrusions: u64,
    pub total_consolidations: u64,
    pub total_ingestions: u64,
    pub detour_depth: usize,
    /// Units per consolidation stage (every stage present, possibly 0)
    pub stage_distribution: BTreeMap<String, usize>,
    pub mean_salience: f64,
    pub max_salience: f64,
    pub total_links: usize,
}

impl AdvancedXpEnvironment {
    /// Aggregate statistics. No side effects.
    pub fn get_comprehensive_statistics(&self) -> EnvironmentStatistics {
        let n = self.xpunits.len();

        let mut consciousness_distribution: BTreeMap<String, usize> = ConsciousnessLevel::ALL
            .iter()
            .map(|level| (level.as_str().to_string(), 0))
            .collect();
        let mut stage_distribution: BTreeMap<String, usize> = ConsolidationStage::ALL
            .iter()
            .map(|stage| (stage.as_str().to_string(), 0))
            .collect();

        let mut consciousness_sum = 0.0;
        let mut magnitude_sum = 0.0;
        let mut valence_sum = 0.0;
        let mut arousal_sum = 0.0;
        let mut salience_sum = 0.0;
        let mut max_salience: f64 = 0.0;
        let mut total_links = 0;
        let mut flashbulb_units = 0;

        for unit in self.xpunits.values() {
            let level = ConsciousnessLevel::from_score(unit.consciousness_score);
            *consciousness_distribution
                .entry(level.as_str().to_string())
                .or_insert(0) += 1;
            *stage_distribution
                .entry(unit.consolidation.as_str().to_string())
                .or_insert(0) += 1;

            consciousness_sum += unit.consciousness_score;
            magnitude_sum += unit.affect.magnitude();
            valence_sum += unit.affect.valence;
            arousal_sum += unit.affect.arousal;
            salience_sum += unit.salience;
            max_salience = max_salience.max(unit.salience);
            total_links += unit.links.len();
            if unit.is_flashbulb() {
                flashbulb_units += 1;
            }
        }

        let mean = |sum: f64| if n > 0 { sum / n as f64 } else { 0.0 };
        let affect_magnitude_mean = mean(magnitude_sum);
        let affect_magnitude_variance = mean(
            self.xpunits
                .values()
                .map(|u| (u.affect.magnitude() - affect_magnitude_mean).powi(2))
                .sum(),
        );

        EnvironmentStatistics {
            total_units: n,
            flashbulb_units,
            consciousness_distribution,
            mean_consciousness: mean(consciousness_sum),
            affect_magnitude_mean,
            affect_magnitude_variance,
            mean_valence: mean(valence_sum),
            mean_arousal: mean(arousal_sum),
            mood_state: self.mood_state,
            active_topic_buffers: self.topic_buffers.values().filter(|t| !t.is_empty()).count(),
            narrative_capsules: self.narrative_capsules.len(),
            total_intrusions: self.total_intrusions,
            total_consolidations: self.total_consolidations,
            total_ingestions: self.total_ingestions,
            detour_depth: self.detour_stack.len(),
            stage_distribution,
            mean_salience: mean(salience_sum),
            max_salience,
            total_links,
        }
    }
}
