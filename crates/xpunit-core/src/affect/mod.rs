//! Affect Module
//!
//! Two-dimensional emotion (Russell's circumplex) attached to every unit:
//! - `valence` in [-1, 1] (negative to positive)
//! - `arousal` in [0, 1] (calm to excited)
//!
//! Construction clamps instead of rejecting: emotion math never fails on
//! extreme inputs. The magnitude bound (`max_affect_magnitude`) is a separate
//! policy enforced by the environment's safeguard pass.

mod appraisal;
mod decay;

pub use appraisal::{AffectAppraiser, AppraisalResult};
pub use decay::{base_decay, effective_retention, emotional_resistance};

use serde::{Deserialize, Serialize};

/// Largest possible magnitude of a clamped affect, `sqrt(1 + 1)`
pub const MAX_RAW_MAGNITUDE: f64 = std::f64::consts::SQRT_2;

// ============================================================================
// AFFECT STATE
// ============================================================================

/// A (valence, arousal) pair. Fields always lie within their bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AffectState {
    /// Emotional valence: -1.0 (very negative) to 1.0 (very positive)
    pub valence: f64,
    /// Emotional arousal: 0.0 (calm) to 1.0 (extremely aroused)
    pub arousal: f64,
}

impl AffectState {
    /// Create a new affect, silently clamping both components.
    ///
    /// NaN collapses to the neutral value of the component.
    pub fn new(valence: f64, arousal: f64) -> Self {
        Self {
            valence: clamp_or(valence, -1.0, 1.0, 0.0),
            arousal: clamp_or(arousal, 0.0, 1.0, 0.0),
        }
    }

    /// Neutral affect (no emotion at all)
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Euclidean magnitude `sqrt(valence² + arousal²)`, in [0, sqrt(2)]
    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.valence * self.valence + self.arousal * self.arousal).sqrt()
    }

    /// Magnitude normalized to [0, 1]. Used for decay resistance and boosts.
    #[inline]
    pub fn intensity(&self) -> f64 {
        (self.magnitude() / MAX_RAW_MAGNITUDE).clamp(0.0, 1.0)
    }

    /// Distance between two affects in the valence/arousal plane
    pub fn distance(&self, other: &AffectState) -> f64 {
        let dv = self.valence - other.valence;
        let da = self.arousal - other.arousal;
        (dv * dv + da * da).sqrt()
    }

    /// Move toward `target` by `rate` (0 = stay, 1 = jump), re-clamping afterwards.
    pub fn blend_toward(&mut self, target: &AffectState, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        *self = Self::new(
            self.valence + rate * (target.valence - self.valence),
            self.arousal + rate * (target.arousal - self.arousal),
        );
    }

    /// Valence agreement between two affects, in [0, 1].
    ///
    /// 1.0 means identical valence, 0.0 means opposite extremes.
    pub fn congruence(&self, other: &AffectState) -> f64 {
        1.0 - (self.valence - other.valence).abs() / 2.0
    }

    /// Scale both components so that `magnitude() <= max_magnitude`.
    ///
    /// Returns whether anything changed. Values already within a relative
    /// tolerance of the bound are left alone, so repeated calls are a fixed point.
    pub fn clamp_magnitude(&mut self, max_magnitude: f64) -> bool {
        let magnitude = self.magnitude();
        if !magnitude.is_finite() {
            *self = Self::neutral();
            return true;
        }
        if magnitude <= max_magnitude * (1.0 + 1e-9) || magnitude == 0.0 {
            return false;
        }
        let scale = max_magnitude / magnitude;
        *self = Self::new(self.valence * scale, self.arousal * scale);
        true
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

// ============================================================================
// TESTS
// ============================================================================
