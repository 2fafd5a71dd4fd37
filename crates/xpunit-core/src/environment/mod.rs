//! # Advanced XP Environment
//!
//! The only owner of units. Everything else (topic buffers, narrative
//! capsules, links, detour frames) refers to units by id.
//!
//! Ingestion pipeline:
//! 1. Advance transient state (link TTLs, detour frames)
//! 2. Appraise affect (unless supplied) and create the unit
//! 3. Score consciousness against the thread's trailing scores
//! 4. Link to the previous unit of the thread and append to the thread
//! 5. Check intrusion against the topic as it was *before* this unit
//! 6. Fold the unit into the topic, blend it into the global mood
//! 7. On intrusion, open a flashbulb detour if the stack has room
//!
//! Single-owner and synchronous: wrap in a `Mutex` if several threads need it.

mod consolidation;
mod detour;
mod safeguards;
mod snapshot;
mod stats;

pub use consolidation::{ConsolidationReport, MergeRecord};
pub use detour::DetourFrame;
pub use safeguards::SafeguardReport;
pub use snapshot::{EnvironmentSnapshot, SNAPSHOT_VERSION};
pub use stats::EnvironmentStatistics;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affect::{AffectAppraiser, AffectState};
use crate::consciousness::{ConsciousnessScorer, PatternScorer};
use crate::error::Result;
use crate::hrr::{cosine_similarity, HrrSpace, ROLE_CONTENT};
use crate::memory::{AdvancedXpUnit, CapsuleLink, LinkType, ReinforcementOutcome};
use crate::narrative::{NarrativeCapsule, TopicBuffer};
use crate::policy::XpUnitPolicies;

/// Trailing thread scores handed to the consciousness scorer
const CONSCIOUSNESS_HISTORY_WINDOW: usize = 10;

/// One ranked result of a cue search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallHit {
    pub content_id: String,
    /// Cosine similarity of cue and context
    pub similarity: f64,
    /// Retention at search time
    pub retention: f64,
    /// Final ranking score
    pub score: f64,
}

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Process-local collection of units and the structures linking them
#[derive(Debug)]
pub struct AdvancedXpEnvironment {
    policies: XpUnitPolicies,
    space: HrrSpace,
    appraiser: AffectAppraiser,
    scorer: Box<dyn ConsciousnessScorer>,
    xpunits: BTreeMap<String, AdvancedXpUnit>,
    topic_buffers: BTreeMap<String, TopicBuffer>,
    narrative_capsules: BTreeMap<String, NarrativeCapsule>,
    mood_state: AffectState,
    detour_stack: Vec<DetourFrame>,
    total_intrusions: u64,
    total_consolidations: u64,
    total_ingestions: u64,
}

impl Default for AdvancedXpEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvancedXpEnvironment {
    /// Environment with default policies and the pattern scorer
    pub fn new() -> Self {
        Self::from_parts(XpUnitPolicies::default(), HrrSpace::default())
    }

    /// Environment with custom policies. Fails on invalid policies.
    pub fn with_policies(policies: XpUnitPolicies) -> Result<Self> {
        policies.validate()?;
        let space = HrrSpace::new(policies.dimension)?;
        Ok(Self::from_parts(policies, space))
    }

    fn from_parts(policies: XpUnitPolicies, space: HrrSpace) -> Self {
        Self {
            policies,
            space,
            appraiser: AffectAppraiser::new(),
            scorer: Box::new(PatternScorer::default()),
            xpunits: BTreeMap::new(),
            topic_buffers: BTreeMap::new(),
            narrative_capsules: BTreeMap::new(),
            mood_state: AffectState::neutral(),
            detour_stack: Vec::new(),
            total_intrusions: 0,
            total_consolidations: 0,
            total_ingestions: 0,
        }
    }

    /// Replace the consciousness scorer
    pub fn with_scorer(mut self, scorer: impl ConsciousnessScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Replace the affect appraiser
    pub fn with_appraiser(mut self, appraiser: AffectAppraiser) -> Self {
        self.appraiser = appraiser;
        self
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Ingest text, appraising its affect from the text itself. Never fails.
    pub fn ingest_experience(
        &mut self,
        content: &str,
        thread_id: &str,
        topic_id: &str,
    ) -> &AdvancedXpUnit {
        let affect = self.appraiser.appraise(content);
        self.ingest_experience_with_affect(content, thread_id, topic_id, affect)
    }

    /// Ingest text with a caller-supplied affect. Never fails.
    pub fn ingest_experience_with_affect(
        &mut self,
        content: &str,
        thread_id: &str,
        topic_id: &str,
        affect: AffectState,
    ) -> &AdvancedXpUnit {
        self.advance_transient_state();
        self.total_ingestions += 1;

        let content_id = format!("xp-{}", uuid::Uuid::new_v4());
        let mut unit =
            AdvancedXpUnit::new(content_id.clone(), content, affect, &self.space, &self.policies);
        unit.thread_id = Some(thread_id.to_string());
        unit.topic_id = Some(topic_id.to_string());

        // Narrative
        let thread = self
            .narrative_capsules
            .entry(thread_id.to_string())
            .or_insert_with(|| NarrativeCapsule::new(thread_id));
        unit.analyze_consciousness(
            self.scorer.as_ref(),
            thread.recent_scores(CONSCIOUSNESS_HISTORY_WINDOW),
            &self.policies,
        );
        if let Some(previous) = thread.last_capsule_id().and_then(|id| self.xpunits.get(id)) {
            let similarity = f64::from(cosine_similarity(&previous.context_vec, &unit.context_vec));
            unit.links.push(
                CapsuleLink::new(LinkType::Narrative, previous.content_id.clone(), similarity)
                    .with_reason(format!("follows in thread '{}'", thread_id)),
            );
        }
        thread.append(&unit);

        // Topic: intrusion is judged against the topic as it stood before this unit
        let dimension = self.space.dimension();
        let topic = self
            .topic_buffers
            .entry(topic_id.to_string())
            .or_insert_with(|| TopicBuffer::new(topic_id, dimension));
        let intrusive =
            !topic.is_empty() && unit.check_intrusion(&topic.topic_vector, topic_id, &self.policies);
        topic.update(&unit, self.policies.topic_drift_floor);

        self.mood_state
            .blend_toward(&unit.affect, self.policies.mood_update_rate);

        tracing::debug!(
            content_id = %content_id,
            thread_id = thread_id,
            topic_id = topic_id,
            valence = unit.affect.valence,
            arousal = unit.affect.arousal,
            consciousness = unit.consciousness_score,
            intrusive = intrusive,
            "Ingested experience"
        );

        if intrusive {
            self.total_intrusions += 1;
            self.open_detour(&unit, topic_id);
        }

        self.xpunits.entry(content_id).or_insert(unit)
    }

    /// Decrement link TTLs and detour frames; prune what reached zero.
    fn advance_transient_state(&mut self) {
        let mut pruned = 0;
        for unit in self.xpunits.values_mut() {
            pruned += unit.tick_links();
        }
        let closed = self.tick_detours();
        if pruned > 0 || closed > 0 {
            tracing::debug!(
                links_pruned = pruned,
                detours_closed = closed,
                "Advanced transient state"
            );
        }
    }

    // ========================================================================
    // RECALL AND UPDATES
    // ========================================================================

    /// Recall a unit, reconsolidating it now. `None` for unknown ids.
    pub fn recall_experience(&mut self, content_id: &str) -> Option<&AdvancedXpUnit> {
        self.recall_experience_at(content_id, Utc::now())
    }

    /// Recall a unit, reconsolidating it at `timestamp`.
    pub fn recall_experience_at(
        &mut self,
        content_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<&AdvancedXpUnit> {
        let unit = self.xpunits.get_mut(content_id)?;
        let advanced = unit.reconsolidate_on_recall(timestamp, &self.policies);
        tracing::debug!(
            content_id = content_id,
            rehearsals = unit.rehearsals,
            stage = %unit.consolidation,
            advanced = advanced,
            "Recalled experience"
        );
        Some(unit)
    }

    /// Append evidence to an existing unit: the text is bound under `content`
    /// alongside `extra_pairs`, then consciousness is re-scored.
    ///
    /// `Ok(false)` for unknown ids; `Err` on a dimension mismatch.
    pub fn append_evidence(
        &mut self,
        content_id: &str,
        text: &str,
        extra_pairs: &[(String, Vec<f32>)],
    ) -> Result<bool> {
        let Some(unit) = self.xpunits.get_mut(content_id) else {
            return Ok(false);
        };
        let mut pairs = Vec::with_capacity(extra_pairs.len() + 1);
        pairs.push((ROLE_CONTENT.to_string(), self.space.encode_text(text)));
        pairs.extend(extra_pairs.iter().cloned());
        unit.append_evidence(&self.space, text, &pairs, &self.policies)?;

        let history = unit
            .thread_id
            .as_ref()
            .and_then(|t| self.narrative_capsules.get(t))
            .map(|thread| thread.recent_scores(CONSCIOUSNESS_HISTORY_WINDOW).to_vec())
            .unwrap_or_default();
        unit.analyze_consciousness(self.scorer.as_ref(), &history, &self.policies);
        Ok(true)
    }

    /// Reinforce a unit toward `delta` under the current global mood.
    ///
    /// When `source_id` names another stored unit, an EMOTIONAL link to it is recorded.
    pub fn reinforce_experience(
        &mut self,
        content_id: &str,
        delta: AffectState,
        source_id: Option<&str>,
    ) -> Option<ReinforcementOutcome> {
        let source_id = source_id.filter(|s| *s != content_id && self.xpunits.contains_key(*s));
        let unit = self.xpunits.get_mut(content_id)?;
        let outcome = unit.emotional_reinforcement(&delta, &self.mood_state, &self.policies);
        if let Some(source) = source_id {
            unit.links.push(
                CapsuleLink::new(LinkType::Emotional, source, outcome.affect_shift)
                    .with_affect_spike(delta.magnitude())
                    .with_reason(format!("reinforced by '{}'", source)),
            );
        }
        Some(outcome)
    }

    /// Rank units by similarity to `cue`, weighted by retention and a
    /// mood-congruent emotional boost. Read-only: nothing is reconsolidated.
    pub fn search_experiences(&self, cue: &str, limit: usize, now: DateTime<Utc>) -> Vec<RecallHit> {
        let cue_vec = self
            .space
            .convolve(&self.space.role(ROLE_CONTENT), &self.space.encode_text(cue));
        let boost = self.policies.emotional_retrieval_boost;

        let mut hits: Vec<RecallHit> = self
            .xpunits
            .values()
            .filter_map(|unit| {
                let similarity = f64::from(cosine_similarity(&cue_vec, &unit.context_vec));
                if similarity <= 0.0 {
                    return None;
                }
                let retention = unit.retention_at(now, &self.policies);
                let emotional = 1.0
                    + boost * unit.affect.intensity() * self.mood_state.congruence(&unit.affect);
                Some(RecallHit {
                    content_id: unit.content_id.clone(),
                    similarity,
                    retention,
                    score: similarity * retention * emotional,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.content_id.cmp(&b.content_id))
        });
        hits.truncate(limit);
        hits
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn unit(&self, content_id: &str) -> Option<&AdvancedXpUnit> {
        self.xpunits.get(content_id)
    }

    /// All units, ordered by id
    pub fn units(&self) -> impl Iterator<Item = &AdvancedXpUnit> {
        self.xpunits.values()
    }

    pub fn len(&self) -> usize {
        self.xpunits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xpunits.is_empty()
    }

    pub fn topic_buffer(&self, topic_id: &str) -> Option<&TopicBuffer> {
        self.topic_buffers.get(topic_id)
    }

    pub fn topic_buffers(&self) -> impl Iterator<Item = &TopicBuffer> {
        self.topic_buffers.values()
    }

    pub fn narrative_capsule(&self, thread_id: &str) -> Option<&NarrativeCapsule> {
        self.narrative_capsules.get(thread_id)
    }

    pub fn narrative_capsules(&self) -> impl Iterator<Item = &NarrativeCapsule> {
        self.narrative_capsules.values()
    }

    /// Global mood
    pub fn mood_state(&self) -> AffectState {
        self.mood_state
    }

    /// Open detours, oldest first
    pub fn detour_stack(&self) -> &[DetourFrame] {
        &self.detour_stack
    }

    pub fn policies(&self) -> &XpUnitPolicies {
        &self.policies
    }

    pub fn space(&self) -> &HrrSpace {
        &self.space
    }

    pub fn total_intrusions(&self) -> u64 {
        self.total_intrusions
    }

    pub fn total_consolidations(&self) -> u64 {
        self.total_consolidations
    }

    pub fn total_ingestions(&self) -> u64 {
        self.total_ingestions
    }
}

// ============================================================================
// TESTS
// ============================================================================
