//! Runaway-affect safeguards
//!
//! Update rules let salience and affect drift; this pass restores the global
//! bounds on demand. Running it twice changes nothing the second time.

use serde::{Deserialize, Serialize};

use super::AdvancedXpEnvironment;

/// What a safeguard pass corrected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeguardReport {
    pub units_checked: usize,
    /// Units whose affect magnitude was scaled down
    pub affect_clamped: usize,
    /// Units whose salience was pulled back into [0, max]
    pub salience_clamped: usize,
    /// Non-finite scores replaced
    pub non_finite_repaired: usize,
    pub mood_clamped: bool,
    /// Detour frames dropped beyond the depth bound
    pub detours_trimmed: usize,
}

impl SafeguardReport {
    /// Whether the pass changed anything
    pub fn changed(&self) -> bool {
        self.affect_clamped > 0
            || self.salience_clamped > 0
            || self.non_finite_repaired > 0
            || self.mood_clamped
            || self.detours_trimmed > 0
    }
}

fn repair_unit_interval(value: &mut f64, fallback: f64) -> bool {
    if !value.is_finite() {
        *value = fallback;
        true
    } else if !(0.0..=1.0).contains(value) {
        *value = value.clamp(0.0, 1.0);
        true
    } else {
        false
    }
}

impl AdvancedXpEnvironment {
    /// Clamp every unit's affect magnitude to `max_affect_magnitude` and
    /// salience to `max_salience`, repair non-finite scores, and bound the mood
    /// and the detour stack.
    pub fn apply_runaway_affect_safeguards(&mut self) -> SafeguardReport {
        let max_salience = self.policies.max_salience;
        let max_magnitude = self.policies.max_affect_magnitude;
        let mut report = SafeguardReport::default();

        for unit in self.xpunits.values_mut() {
            report.units_checked += 1;

            if unit.affect.clamp_magnitude(max_magnitude) {
                report.affect_clamped += 1;
            }

            if unit.salience.is_nan() {
                unit.salience = self.policies.base_salience.min(max_salience);
                report.non_finite_repaired += 1;
            } else if unit.salience > max_salience || unit.salience < 0.0 {
                unit.salience = unit.salience.clamp(0.0, max_salience);
                report.salience_clamped += 1;
            }

            let mut repaired = 0;
            repaired += usize::from(repair_unit_interval(
                &mut unit.importance,
                self.policies.base_importance,
            ));
            repaired += usize::from(repair_unit_interval(
                &mut unit.reliability,
                self.policies.base_reliability,
            ));
            repaired += usize::from(repair_unit_interval(&mut unit.consciousness_score, 0.0));
            report.non_finite_repaired += repaired;
        }

        report.mood_clamped = self.mood_state.clamp_magnitude(max_magnitude);

        let max_depth = self.policies.max_intrusion_detours;
        if self.detour_stack.len() > max_depth {
            report.detours_trimmed = self.detour_stack.len() - max_depth;
            self.detour_stack.truncate(max_depth);
        }

        tracing::info!(
            units = report.units_checked,
            affect_clamped = report.affect_clamped,
            salience_clamped = report.salience_clamped,
            repaired = report.non_finite_repaired,
            mood_clamped = report.mood_clamped,
            detours_trimmed = report.detours_trimmed,
            "Applied runaway affect safeguards"
        );
        report
    }
}
