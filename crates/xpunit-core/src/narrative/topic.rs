//! Topic buffer
//!
//! The topic vector is an exponential moving average of member contexts with
//! rate `max(1/n, drift_floor)`. Early on this is the running mean; once a
//! topic is established the floor keeps it adapting, slowly enough that
//! gradual drift is not mistaken for intrusion.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hrr::cosine_similarity;
use crate::memory::AdvancedXpUnit;

/// Rolling aggregate of one topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicBuffer {
    pub topic_id: String,
    /// Semantic center of the topic
    pub topic_vector: Vec<f32>,
    /// Member unit ids
    pub capsule_ids: BTreeSet<String>,
    /// Most recently folded-in unit
    pub last_capsule_id: Option<String>,
    /// Number of updates so far
    pub update_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TopicBuffer {
    /// Empty topic with a zero vector of `dimension` components
    pub fn new(topic_id: impl Into<String>, dimension: usize) -> Self {
        let now = Utc::now();
        Self {
            topic_id: topic_id.into(),
            topic_vector: vec![0.0; dimension],
            capsule_ids: BTreeSet::new(),
            last_capsule_id: None,
            update_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether no unit has been folded in yet
    pub fn is_empty(&self) -> bool {
        self.update_count == 0
    }

    pub fn len(&self) -> usize {
        self.capsule_ids.len()
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.capsule_ids.contains(content_id)
    }

    /// Fold `unit` into the topic vector and add it to the membership.
    pub fn update(&mut self, unit: &AdvancedXpUnit, drift_floor: f64) {
        self.update_count += 1;
        let rate = (1.0 / self.update_count as f64).max(drift_floor).clamp(0.0, 1.0) as f32;
        for (t, c) in self.topic_vector.iter_mut().zip(unit.context_vec.iter()) {
            *t = (1.0 - rate) * *t + rate * c;
        }
        self.capsule_ids.insert(unit.content_id.clone());
        self.last_capsule_id = Some(unit.content_id.clone());
        self.updated_at = Utc::now();
    }

    /// Similarity of a context vector to the topic center
    pub fn topicality(&self, context: &[f32]) -> f64 {
        f64::from(cosine_similarity(&self.topic_vector, context))
    }

    /// Replace a merged-away member by its survivor
    pub(crate) fn replace_member(&mut self, from: &str, to: &str) {
        if self.capsule_ids.remove(from) {
            self.capsule_ids.insert(to.to_string());
        }
        if self.last_capsule_id.as_deref() == Some(from) {
            self.last_capsule_id = Some(to.to_string());
        }
    }
}
