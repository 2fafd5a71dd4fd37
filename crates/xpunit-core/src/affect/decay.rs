//! Retention decay with emotional resistance
//!
//! Two composable pieces:
//! - `base_decay(age)`: plain exponential forgetting with a half-life
//! - `emotional_resistance(affect, age)`: how much of the lost retention an
//!   emotional memory holds on to, in [0, 1)
//!
//! Combined as `effective = base + resistance * (1 - base)`, which can only
//! move retention toward 1. Emotion never accelerates forgetting.

use super::AffectState;
use crate::policy::XpUnitPolicies;

/// Exponential retention factor after `age_hours`, in (0, 1].
pub fn base_decay(age_hours: f64, half_life_hours: f64) -> f64 {
    if age_hours <= 0.0 || half_life_hours <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(age_hours / half_life_hours).clamp(0.0, 1.0)
}

/// Fraction of decayed retention preserved by emotional intensity, in [0, 1).
///
/// Resistance fades slowly with age (ten half-lives to halve).
pub fn emotional_resistance(affect: &AffectState, age_hours: f64, policies: &XpUnitPolicies) -> f64 {
    let age = age_hours.max(0.0);
    let fade = 1.0 / (1.0 + age / (10.0 * policies.decay_half_life_hours));
    (policies.emotional_decay_resistance * affect.intensity() * fade).clamp(0.0, 0.999)
}

/// Retention after combining base decay with emotional resistance.
pub fn effective_retention(base: f64, resistance: f64) -> f64 {
    let base = base.clamp(0.0, 1.0);
    let resistance = resistance.clamp(0.0, 1.0);
    base + resistance * (1.0 - base)
}
