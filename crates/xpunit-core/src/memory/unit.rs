//! The Advanced XPUnit
//!
//! One memory: text trace, affect, HRR capsule, lifecycle metadata and edges.
//! Update rules:
//!
//! - `append_evidence`: cumulative, append-only evidence; not idempotent
//! - `emotional_reinforcement`: mood-congruent affect blend, salience only rises
//! - `reconsolidate_on_recall`: rehearsal count drives a forward-only stage
//! - `check_intrusion`: loud but off-topic memories are flagged
//!
//! Salience and affect are allowed to drift past their policy bounds here;
//! the environment's safeguard pass pulls them back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CapsuleLink, ConsolidationStage, LinkType};
use crate::affect::{base_decay, effective_retention, emotional_resistance, AffectState};
use crate::consciousness::ConsciousnessScorer;
use crate::error::{ensure_dimension, Result, XpError};
use crate::hrr::{cosine_similarity, HrrSpace, MemoryCapsule, ROLE_CONTENT, ROLE_FLASHBULB};
use crate::policy::XpUnitPolicies;

/// Mood tag carried by flashbulb capsules
pub const FLASHBULB_TAG: &str = "flashbulb";

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// What an emotional reinforcement did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinforcementOutcome {
    /// Valence agreement of mood and delta, in [0, 1]
    pub mood_congruence: f64,
    /// Effective blend rate
    pub eta: f64,
    /// Distance the affect moved
    pub affect_shift: f64,
    /// Salience actually added (0 once at the bound)
    pub salience_gain: f64,
}

/// Pure evaluation of the intrusion rule, without side effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrusionAssessment {
    /// Cosine similarity of the context to the topic vector
    pub topicality: f64,
    /// `affect.magnitude()`
    pub affect_magnitude: f64,
    /// `affect_magnitude > θ_A && topicality < θ_T`
    pub intrusive: bool,
}

// ============================================================================
// ADVANCED XPUNIT
// ============================================================================

/// The atomic memory unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedXpUnit {
    /// Unique key
    pub content_id: String,
    /// Latest text
    pub content: String,
    /// Every piece of evidence, oldest first (append-only)
    pub text_trace: Vec<String>,
    /// HRR composition of the capsule
    pub context_vec: Vec<f32>,
    pub affect: AffectState,
    /// Boosted importance; bounded by the safeguard pass
    pub salience: f64,
    /// Importance (0-1)
    pub importance: f64,
    /// Confidence grown by corroborating evidence (0-1)
    pub reliability: f64,
    pub consolidation: ConsolidationStage,
    /// Recall counter
    pub rehearsals: u32,
    pub last_recall: Option<DateTime<Utc>>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    pub links: Vec<CapsuleLink>,
    pub consciousness_score: f64,
    pub consciousness_indicators: BTreeMap<String, f64>,
    pub memory_capsule: MemoryCapsule,
    pub mood_tag: Option<String>,
    /// Mood congruence of the latest reinforcement
    pub last_mood_congruence: Option<f64>,
    /// Thread the unit was ingested into
    pub thread_id: Option<String>,
    /// Topic the unit was ingested into
    pub topic_id: Option<String>,
    /// Ids of units absorbed into this one by consolidation
    pub merged_from: Vec<String>,
}

impl AdvancedXpUnit {
    /// Create a unit whose text is bound under the `content` role.
    ///
    /// Emotional intensity raises the starting salience and importance.
    pub fn new(
        content_id: impl Into<String>,
        content: impl Into<String>,
        affect: AffectState,
        space: &HrrSpace,
        policies: &XpUnitPolicies,
    ) -> Self {
        let content = content.into();
        let mut unit = Self::empty(content_id.into(), affect, space, policies);
        unit.memory_capsule
            .superpose(ROLE_CONTENT, &space.encode_text(&content), 1.0);
        unit.text_trace.push(content.clone());
        unit.content = content;
        unit.recompose(space);
        unit
    }

    fn empty(
        content_id: String,
        affect: AffectState,
        space: &HrrSpace,
        policies: &XpUnitPolicies,
    ) -> Self {
        let intensity = affect.intensity();
        let boost = policies.emotional_importance_boost;
        Self {
            content_id,
            content: String::new(),
            text_trace: Vec::new(),
            context_vec: space.zeros(),
            affect,
            salience: policies.base_salience + boost * intensity,
            importance: (policies.base_importance + boost * intensity).clamp(0.0, 1.0),
            reliability: policies.base_reliability.clamp(0.0, 1.0),
            consolidation: ConsolidationStage::Episodic,
            rehearsals: 0,
            last_recall: None,
            timestamp: Utc::now(),
            links: Vec::new(),
            consciousness_score: 0.0,
            consciousness_indicators: BTreeMap::new(),
            memory_capsule: MemoryCapsule::new(space.dimension()),
            mood_tag: None,
            last_mood_congruence: None,
            thread_id: None,
            topic_id: None,
            merged_from: Vec::new(),
        }
    }

    /// Build the flashbulb capsule of a detour.
    ///
    /// A separate unit tagged `flashbulb` that carries the trigger text under
    /// the `flashbulb` role and three links: EMOTIONAL to the historical
    /// memory, NARRATIVE to the topic capsule, and a RETURN_PATH back to the
    /// topic capsule that expires after `return_path_ttl` ticks.
    pub fn create_flashbulb_capsule(
        trigger: &str,
        historical_id: &str,
        topic_capsule_id: &str,
        affect: AffectState,
        space: &HrrSpace,
        policies: &XpUnitPolicies,
    ) -> Self {
        let id = format!("{}-{}", FLASHBULB_TAG, uuid::Uuid::new_v4());
        let mut unit = Self::empty(id, affect, space, policies);
        unit.memory_capsule
            .superpose(ROLE_FLASHBULB, &space.encode_text(trigger), 1.0);
        unit.text_trace.push(trigger.to_string());
        unit.content = trigger.to_string();
        unit.mood_tag = Some(FLASHBULB_TAG.to_string());
        unit.recompose(space);

        let spike = affect.magnitude();
        unit.links.push(
            CapsuleLink::new(LinkType::Emotional, historical_id, affect.intensity().max(0.5))
                .with_affect_spike(spike)
                .with_reason("flashbulb recall of historical memory"),
        );
        unit.links.push(
            CapsuleLink::new(LinkType::Narrative, topic_capsule_id, 0.5)
                .with_reason("detour opened from topic"),
        );
        unit.links.push(
            CapsuleLink::new(LinkType::ReturnPath, topic_capsule_id, 1.0)
                .with_reason("return to interrupted topic")
                .with_ttl(policies.return_path_ttl),
        );
        unit
    }

    /// Whether this unit is a flashbulb detour capsule
    pub fn is_flashbulb(&self) -> bool {
        self.mood_tag.as_deref() == Some(FLASHBULB_TAG)
    }

    /// Recompute `context_vec` from the capsule
    pub(crate) fn recompose(&mut self, space: &HrrSpace) {
        self.context_vec = self.memory_capsule.compose(space);
    }

    // ========================================================================
    // UPDATE RULES
    // ========================================================================

    /// Append `text` to the trace and bind every `(role, vector)` pair.
    ///
    /// Every vector is checked before anything changes, so a dimension error
    /// leaves the unit untouched. Not idempotent: the same call twice binds twice.
    pub fn append_evidence(
        &mut self,
        space: &HrrSpace,
        text: &str,
        role_symbol_pairs: &[(String, Vec<f32>)],
        policies: &XpUnitPolicies,
    ) -> Result<()> {
        for (_, vector) in role_symbol_pairs {
            ensure_dimension(self.memory_capsule.dimension(), vector.len())?;
        }
        for (role, vector) in role_symbol_pairs {
            self.memory_capsule.superpose(role, vector, 1.0);
        }
        self.text_trace.push(text.to_string());
        self.content = text.to_string();
        self.reliability +=
            policies.evidence_reliability_gain * (1.0 - self.reliability).max(0.0);
        self.recompose(space);
        Ok(())
    }

    /// Move affect toward `delta`, biased by the ambient mood.
    ///
    /// The blend rate grows with mood congruence: a sad mood amplifies a sad
    /// delta and dampens a happy one. Salience rises with the size of the
    /// shift and never falls; it stops at `max_salience` (a value already
    /// above the bound is left for the safeguard pass).
    pub fn emotional_reinforcement(
        &mut self,
        delta: &AffectState,
        mood: &AffectState,
        policies: &XpUnitPolicies,
    ) -> ReinforcementOutcome {
        let congruence = mood.congruence(delta);
        let modulation = 1.0 + policies.mood_congruence_gain * (2.0 * congruence - 1.0) * mood.intensity();
        let eta = (policies.reinforcement_rate * modulation).clamp(0.0, 1.0);

        let before = self.affect;
        self.affect.blend_toward(delta, eta);
        let shift = before.distance(&self.affect);

        let proposed = policies.emotional_importance_boost * shift * (1.0 + delta.intensity());
        let previous = self.salience;
        if proposed.is_finite() && proposed > 0.0 && previous < policies.max_salience {
            self.salience = (previous + proposed).min(policies.max_salience);
        }
        self.last_mood_congruence = Some(congruence);

        ReinforcementOutcome {
            mood_congruence: congruence,
            eta,
            affect_shift: shift,
            salience_gain: self.salience - previous,
        }
    }

    /// Count a recall at `timestamp` and advance the stage if a threshold was crossed.
    ///
    /// Returns whether the stage advanced. The stage never moves backward,
    /// even if `rehearsals` was lowered externally.
    pub fn reconsolidate_on_recall(
        &mut self,
        timestamp: DateTime<Utc>,
        policies: &XpUnitPolicies,
    ) -> bool {
        self.rehearsals = self.rehearsals.saturating_add(1);
        self.last_recall = Some(timestamp);
        self.salience += policies.recall_salience_gain;

        let implied = ConsolidationStage::from_rehearsals(self.rehearsals, policies);
        if implied > self.consolidation {
            self.consolidation = implied;
            true
        } else {
            false
        }
    }

    /// Evaluate the intrusion rule without touching the unit.
    pub fn intrusion_assessment(
        &self,
        topic_vector: &[f32],
        policies: &XpUnitPolicies,
    ) -> IntrusionAssessment {
        let topicality = f64::from(cosine_similarity(&self.context_vec, topic_vector));
        let affect_magnitude = self.affect.magnitude();
        IntrusionAssessment {
            topicality,
            affect_magnitude,
            intrusive: affect_magnitude > policies.theta_a && topicality < policies.theta_t,
        }
    }

    /// Flag this unit as intrusive for `topic_id` when it is loud and off-topic.
    ///
    /// The first detection for a topic records an INTRUSION link; repeated
    /// calls return the same answer without adding more.
    pub fn check_intrusion(
        &mut self,
        topic_vector: &[f32],
        topic_id: &str,
        policies: &XpUnitPolicies,
    ) -> bool {
        let assessment = self.intrusion_assessment(topic_vector, policies);
        if assessment.intrusive && !self.has_intrusion_link(topic_id) {
            self.links.push(
                CapsuleLink::new(LinkType::Intrusion, topic_id, 1.0 - assessment.topicality.max(0.0))
                    .with_affect_spike(assessment.affect_magnitude)
                    .with_reason(format!(
                        "intruded on topic '{}' (topicality {:.3})",
                        topic_id, assessment.topicality
                    )),
            );
        }
        assessment.intrusive
    }

    /// Whether an INTRUSION link for `topic_id` exists
    pub fn has_intrusion_link(&self, topic_id: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.link_type == LinkType::Intrusion && l.target_id == topic_id)
    }

    /// Score the text trace and apply the emotional consciousness boost.
    pub fn analyze_consciousness(
        &mut self,
        scorer: &dyn ConsciousnessScorer,
        history: &[f64],
        policies: &XpUnitPolicies,
    ) -> f64 {
        let report = scorer.score(&self.text_trace.join("\n"), history);
        let boost = 1.0 + policies.emotional_consciousness_boost * self.affect.intensity();
        self.consciousness_score = (report.score * boost).clamp(0.0, 1.0);
        self.consciousness_indicators = report.indicators;
        self.consciousness_score
    }

    /// Decrement transient links and drop the expired ones. Returns how many were dropped.
    pub fn tick_links(&mut self) -> usize {
        let before = self.links.len();
        self.links.retain_mut(|link| link.tick());
        before - self.links.len()
    }

    // ========================================================================
    // RETENTION
    // ========================================================================

    /// Hours since the last recall (or creation), never negative
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let since = self.last_recall.unwrap_or(self.timestamp);
        ((now - since).num_milliseconds() as f64 / 3_600_000.0).max(0.0)
    }

    /// Retention in [0, 1] at `now`: stage-stretched decay plus emotional resistance.
    pub fn retention_at(&self, now: DateTime<Utc>, policies: &XpUnitPolicies) -> f64 {
        let age = self.age_hours(now);
        let half_life = policies.decay_half_life_hours
            * policies.stage_half_life_multiplier(self.consolidation.ordinal());
        let base = base_decay(age, half_life);
        let resistance = emotional_resistance(&self.affect, age, policies);
        effective_retention(base, resistance)
    }

    // ========================================================================
    // MERGING
    // ========================================================================

    /// Fold `other` into this unit (consolidation gisting).
    ///
    /// Text, links and bindings are combined; rehearsals add up; the
    /// lifecycle keeps the furthest stage. Links between the two are dropped.
    pub fn absorb(&mut self, other: AdvancedXpUnit, space: &HrrSpace) {
        let own_id = self.content_id.clone();
        let other_id = other.content_id.clone();

        self.text_trace.extend(other.text_trace);
        self.links.extend(
            other
                .links
                .into_iter()
                .filter(|l| l.target_id != own_id && l.target_id != other_id),
        );
        self.links.retain(|l| l.target_id != other_id);

        self.rehearsals = self.rehearsals.saturating_add(other.rehearsals);
        self.consolidation = self.consolidation.max(other.consolidation);
        self.last_recall = match (self.last_recall, other.last_recall) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.timestamp = self.timestamp.min(other.timestamp);
        self.salience = self.salience.max(other.salience);
        self.importance = self.importance.max(other.importance);
        self.reliability = self.reliability.max(other.reliability);
        if other.affect.magnitude() > self.affect.magnitude() {
            self.affect = other.affect;
        }
        self.consciousness_score = self.consciousness_score.max(other.consciousness_score);
        for (name, score) in other.consciousness_indicators {
            let entry = self.consciousness_indicators.entry(name).or_insert(score);
            *entry = entry.max(score);
        }

        self.memory_capsule.absorb(&other.memory_capsule);
        self.merged_from.push(other_id);
        self.merged_from.extend(other.merged_from);
        self.recompose(space);
    }

    /// Point every link aimed at `from` to `to` instead. Self-links are dropped.
    pub(crate) fn retarget_links(&mut self, from: &str, to: &str) {
        for link in self.links.iter_mut().filter(|l| l.target_id == from) {
            link.target_id = to.to_string();
        }
        let own_id = self.content_id.clone();
        self.links.retain(|l| l.target_id != own_id);
    }

    // ========================================================================
    // SERIALIZATION
    // ========================================================================

    /// Plain-data representation for external stores
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a unit from [`AdvancedXpUnit::to_value`] output.
    ///
    /// Rejects records whose vectors disagree on dimensionality.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let unit: Self = serde_json::from_value(value)?;
        unit.validate()?;
        Ok(unit)
    }

    /// Check internal consistency of a deserialized unit
    pub(crate) fn validate(&self) -> Result<()> {
        if self.content_id.is_empty() {
            return Err(XpError::InvalidRecord("empty contentId".to_string()));
        }
        ensure_dimension(self.memory_capsule.dimension(), self.context_vec.len())?;
        self.memory_capsule.validate()
    }
}

// ============================================================================
// TESTS
// ============================================================================
