//! Plain-data environment snapshots
//!
//! The core performs no I/O. A snapshot is everything needed to rebuild an
//! environment; writing it somewhere is the caller's business.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdvancedXpEnvironment, DetourFrame};
use crate::affect::AffectState;
use crate::consciousness::ConsciousnessScorer;
use crate::error::{ensure_dimension, Result, XpError};
use crate::hrr::HrrSpace;
use crate::memory::AdvancedXpUnit;
use crate::narrative::{NarrativeCapsule, TopicBuffer};
use crate::policy::XpUnitPolicies;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub policies: XpUnitPolicies,
    pub units: Vec<AdvancedXpUnit>,
    pub topic_buffers: Vec<TopicBuffer>,
    pub narrative_capsules: Vec<NarrativeCapsule>,
    pub mood_state: AffectState,
    pub detour_stack: Vec<DetourFrame>,
    pub total_intrusions: u64,
    pub total_consolidations: u64,
    pub total_ingestions: u64,
}

impl EnvironmentSnapshot {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AdvancedXpEnvironment {
    /// Capture the full state. Units are ordered by id.
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            policies: self.policies.clone(),
            units: self.xpunits.values().cloned().collect(),
            topic_buffers: self.topic_buffers.values().cloned().collect(),
            narrative_capsules: self.narrative_capsules.values().cloned().collect(),
            mood_state: self.mood_state,
            detour_stack: self.detour_stack.clone(),
            total_intrusions: self.total_intrusions,
            total_consolidations: self.total_consolidations,
            total_ingestions: self.total_ingestions,
        }
    }

    /// Rebuild an environment with the default scorer.
    ///
    /// Fails fast on invalid policies, vectors of the wrong dimension, or
    /// duplicate ids. Dangling id references are kept and logged.
    pub fn restore(snapshot: EnvironmentSnapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(XpError::InvalidRecord(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        snapshot.policies.validate()?;
        let dimension = snapshot.policies.dimension;

        let mut xpunits = BTreeMap::new();
        for unit in snapshot.units {
            unit.validate()?;
            ensure_dimension(dimension, unit.context_vec.len())?;
            let id = unit.content_id.clone();
            if xpunits.insert(id.clone(), unit).is_some() {
                return Err(XpError::InvalidRecord(format!("duplicate unit id '{}'", id)));
            }
        }

        let mut topic_buffers = BTreeMap::new();
        for topic in snapshot.topic_buffers {
            ensure_dimension(dimension, topic.topic_vector.len())?;
            topic_buffers.insert(topic.topic_id.clone(), topic);
        }

        let narrative_capsules: BTreeMap<String, NarrativeCapsule> = snapshot
            .narrative_capsules
            .into_iter()
            .map(|thread| (thread.thread_id.clone(), thread))
            .collect();

        let dangling = narrative_capsules
            .values()
            .flat_map(|t| t.linked_capsules.iter())
            .chain(topic_buffers.values().flat_map(|t| t.capsule_ids.iter()))
            .filter(|id| !xpunits.contains_key(id.as_str()))
            .count();
        if dangling > 0 {
            tracing::warn!(dangling = dangling, "Snapshot references units it does not contain");
        }

        let mut env = Self::from_parts(snapshot.policies, HrrSpace::new(dimension)?);
        env.xpunits = xpunits;
        env.topic_buffers = topic_buffers;
        env.narrative_capsules = narrative_capsules;
        env.mood_state = AffectState::new(snapshot.mood_state.valence, snapshot.mood_state.arousal);
        env.detour_stack = snapshot.detour_stack;
        env.total_intrusions = snapshot.total_intrusions;
        env.total_consolidations = snapshot.total_consolidations;
        env.total_ingestions = snapshot.total_ingestions;

        tracing::debug!(units = env.xpunits.len(), "Restored environment");
        Ok(env)
    }

    /// Rebuild an environment and install `scorer`.
    pub fn restore_with_scorer(
        snapshot: EnvironmentSnapshot,
        scorer: impl ConsciousnessScorer + 'static,
    ) -> Result<Self> {
        Ok(Self::restore(snapshot)?.with_scorer(scorer))
    }
}
