//! Policy constants for the memory core
//!
//! Every threshold the update rules depend on lives in [`XpUnitPolicies`] so
//! experiments can retune behaviour without touching code. The intrusion and
//! consolidation thresholds in particular have no single canonical value:
//! the defaults are the most recent calibration, not physics.

use serde::{Deserialize, Serialize};

use crate::error::{Result, XpError};

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default HRR dimensionality
pub const DEFAULT_DIMENSION: usize = 512;

/// Default intrusion affect threshold (θ_A). Calibrations between 0.6 and 0.7 are common.
pub const DEFAULT_THETA_A: f64 = 0.65;

/// Default intrusion topicality threshold (θ_T)
pub const DEFAULT_THETA_T: f64 = 0.15;

/// Default rehearsal thresholds for the consolidation lifecycle
pub const DEFAULT_R1: u32 = 3;
pub const DEFAULT_R2: u32 = 7;
pub const DEFAULT_R3: u32 = 15;

/// Default TTL of return-path links and detour frames (in ingestions)
pub const DEFAULT_RETURN_PATH_TTL: u32 = 2;

// ============================================================================
// POLICIES
// ============================================================================

/// Injectable configuration for units and the environment.
///
/// Missing fields fall back to defaults when deserializing, so a policy file
/// only needs to name what an experiment changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XpUnitPolicies {
    /// HRR dimensionality `D`
    pub dimension: usize,
    /// Affect magnitude above which an off-topic unit counts as intrusive
    pub theta_a: f64,
    /// Topicality below which a unit counts as off-topic
    pub theta_t: f64,
    /// Rehearsals needed to reach `Consolidating`
    pub r1: u32,
    /// Rehearsals needed to reach `Consolidated`
    pub r2: u32,
    /// Rehearsals needed to reach `Remote`
    pub r3: u32,
    /// Bound enforced on salience by the safeguard pass
    pub max_salience: f64,
    /// Bound enforced on affect magnitude by the safeguard pass
    pub max_affect_magnitude: f64,
    /// Maximum depth of the detour stack
    ///
    /// Frames expire after `return_path_ttl` ingestions, so ingestion alone
    /// never stacks more than `return_path_ttl` frames. See
    /// [`XpUnitPolicies::natural_detour_depth`].
    pub max_intrusion_detours: usize,
    /// TTL of return-path links and detour frames
    pub return_path_ttl: u32,
    /// Base half-life of retention, in hours
    pub decay_half_life_hours: f64,
    /// Scale of emotional decay resistance, in [0, 1)
    pub emotional_decay_resistance: f64,
    /// How strongly affect raises importance and salience
    pub emotional_importance_boost: f64,
    /// How strongly affect raises cue-search ranking
    pub emotional_retrieval_boost: f64,
    /// How strongly affect raises the consciousness score
    pub emotional_consciousness_boost: f64,
    /// Salience of a neutral new unit
    pub base_salience: f64,
    /// Importance of a neutral new unit
    pub base_importance: f64,
    /// Reliability of a single-source unit
    pub base_reliability: f64,
    /// Fraction of the remaining reliability gap closed per appended evidence
    pub evidence_reliability_gain: f64,
    /// Salience added per recall (not clamped; the safeguard pass bounds it)
    pub recall_salience_gain: f64,
    /// Base blend rate of emotional reinforcement
    pub reinforcement_rate: f64,
    /// How strongly mood congruence modulates the reinforcement rate
    pub mood_congruence_gain: f64,
    /// EMA rate of the global mood
    pub mood_update_rate: f64,
    /// Minimum EMA rate of a topic vector
    pub topic_drift_floor: f64,
    /// Default similarity threshold for consolidation merges
    pub consolidation_threshold: f64,
}

impl Default for XpUnitPolicies {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            theta_a: DEFAULT_THETA_A,
            theta_t: DEFAULT_THETA_T,
            r1: DEFAULT_R1,
            r2: DEFAULT_R2,
            r3: DEFAULT_R3,
            max_salience: 3.0,
            max_affect_magnitude: 1.0,
            max_intrusion_detours: 3,
            return_path_ttl: DEFAULT_RETURN_PATH_TTL,
            decay_half_life_hours: 72.0,
            emotional_decay_resistance: 0.6,
            emotional_importance_boost: 0.5,
            emotional_retrieval_boost: 0.3,
            emotional_consciousness_boost: 0.2,
            base_salience: 1.0,
            base_importance: 0.5,
            base_reliability: 0.5,
            evidence_reliability_gain: 0.1,
            recall_salience_gain: 0.1,
            reinforcement_rate: 0.5,
            mood_congruence_gain: 0.8,
            mood_update_rate: 0.2,
            topic_drift_floor: 0.05,
            consolidation_threshold: 0.92,
        }
    }
}

impl XpUnitPolicies {
    /// Reject policies that would make the update rules meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(invalid("dimension must be positive"));
        }
        if !(0.0..=std::f64::consts::SQRT_2).contains(&self.theta_a) {
            return Err(invalid("thetaA must lie in [0, sqrt(2)]"));
        }
        if !(-1.0..=1.0).contains(&self.theta_t) {
            return Err(invalid("thetaT must lie in [-1, 1]"));
        }
        if !(self.r1 > 0 && self.r1 < self.r2 && self.r2 < self.r3) {
            return Err(invalid("rehearsal thresholds must satisfy 0 < r1 < r2 < r3"));
        }
        if self.max_salience <= 0.0 || !self.max_salience.is_finite() {
            return Err(invalid("maxSalience must be positive and finite"));
        }
        if self.max_affect_magnitude <= 0.0 || !self.max_affect_magnitude.is_finite() {
            return Err(invalid("maxAffectMagnitude must be positive and finite"));
        }
        if self.decay_half_life_hours <= 0.0 || !self.decay_half_life_hours.is_finite() {
            return Err(invalid("decayHalfLifeHours must be positive and finite"));
        }
        if !(0.0..1.0).contains(&self.emotional_decay_resistance) {
            return Err(invalid("emotionalDecayResistance must lie in [0, 1)"));
        }
        for (name, rate) in [
            ("evidenceReliabilityGain", self.evidence_reliability_gain),
            ("reinforcementRate", self.reinforcement_rate),
            ("moodUpdateRate", self.mood_update_rate),
            ("topicDriftFloor", self.topic_drift_floor),
            ("baseReliability", self.base_reliability),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(&format!("{} must lie in [0, 1]", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.consolidation_threshold) {
            return Err(invalid("consolidationThreshold must lie in [0, 1]"));
        }
        if self.natural_detour_depth() < self.max_intrusion_detours {
            tracing::debug!(
                return_path_ttl = self.return_path_ttl,
                max_intrusion_detours = self.max_intrusion_detours,
                "Detours expire before ingestion can fill the stack; the depth bound only applies to engage_detour"
            );
        }
        Ok(())
    }

    /// Deepest detour stack that back-to-back intrusive ingestions can build.
    pub fn natural_detour_depth(&self) -> usize {
        self.max_intrusion_detours
            .min(usize::try_from(self.return_path_ttl).unwrap_or(usize::MAX))
    }

    /// Retention half-life multiplier for a consolidation stage ordinal.
    pub fn stage_half_life_multiplier(&self, stage_ordinal: u8) -> f64 {
        f64::from(1u32 << stage_ordinal.min(3))
    }
}

fn invalid(message: &str) -> XpError {
    XpError::InvalidPolicy(message.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
