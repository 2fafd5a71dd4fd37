//! Narrative capsule: append-only record of one thread.
//!
//! `linked_capsules`, `text_trace`, `timestamps` and `consciousness_history`
//! stay index-aligned: entry `i` of each describes the `i`-th ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::AdvancedXpUnit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeCapsule {
    pub thread_id: String,
    /// Unit ids in ingestion order
    pub linked_capsules: Vec<String>,
    /// Ingested text in order
    pub text_trace: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    /// Consciousness score of each ingestion
    pub consciousness_history: Vec<f64>,
}

impl NarrativeCapsule {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            linked_capsules: Vec::new(),
            text_trace: Vec::new(),
            timestamps: Vec::new(),
            consciousness_history: Vec::new(),
        }
    }

    /// Append a unit's id and text. Purely additive.
    pub fn append(&mut self, unit: &AdvancedXpUnit) {
        self.linked_capsules.push(unit.content_id.clone());
        self.text_trace.push(unit.content.clone());
        self.timestamps.push(unit.timestamp);
        self.consciousness_history.push(unit.consciousness_score);
    }

    pub fn len(&self) -> usize {
        self.linked_capsules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linked_capsules.is_empty()
    }

    /// Most recently appended unit
    pub fn last_capsule_id(&self) -> Option<&str> {
        self.linked_capsules.last().map(String::as_str)
    }

    /// Trailing consciousness scores, at most `window`, oldest first
    pub fn recent_scores(&self, window: usize) -> &[f64] {
        let start = self.consciousness_history.len().saturating_sub(window);
        &self.consciousness_history[start..]
    }

    /// Replace a merged-away unit id. Text and order are kept.
    pub(crate) fn replace_member(&mut self, from: &str, to: &str) {
        for id in self.linked_capsules.iter_mut().filter(|id| id.as_str() == from) {
            *id = to.to_string();
        }
    }
}
