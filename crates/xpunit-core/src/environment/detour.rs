//! Flashbulb detours
//!
//! An intrusion opens a bounded excursion: a flashbulb capsule linked to the
//! most similar historical memory, plus a frame on the detour stack that
//! remembers where to return. Frames expire after `return_path_ttl`
//! ingestions, in step with the flashbulb's RETURN_PATH link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AdvancedXpEnvironment;
use crate::hrr::cosine_similarity;
use crate::memory::AdvancedXpUnit;

/// One open detour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetourFrame {
    /// The flashbulb capsule of this detour
    pub flashbulb_id: String,
    /// The unit whose intrusion opened it
    pub intruding_id: String,
    /// The interrupted topic
    pub topic_id: String,
    /// Unit (or topic id) the return path points at
    pub return_to: String,
    /// Ingestions left before the frame closes
    pub remaining_ttl: u32,
    pub opened_at: DateTime<Utc>,
}

impl DetourFrame {
    /// Whether the frame keeps `content_id` from being merged away
    pub fn pins(&self, content_id: &str) -> bool {
        self.flashbulb_id == content_id
            || self.intruding_id == content_id
            || self.return_to == content_id
    }
}

impl AdvancedXpEnvironment {
    /// Open a flashbulb detour for a stored unit intruding on `topic_id`.
    ///
    /// Returns the flashbulb id, or `None` when the unit is unknown or the
    /// detour stack is already at `max_intrusion_detours`.
    pub fn engage_detour(&mut self, intruding_id: &str, topic_id: &str) -> Option<String> {
        let intruding = self.xpunits.get(intruding_id)?.clone();
        self.open_detour(&intruding, topic_id)
    }

    /// Close the newest detour and hand back its return path.
    pub fn resolve_detour(&mut self) -> Option<DetourFrame> {
        let frame = self.detour_stack.pop()?;
        tracing::debug!(
            flashbulb_id = %frame.flashbulb_id,
            return_to = %frame.return_to,
            "Resolved detour"
        );
        Some(frame)
    }

    pub(super) fn open_detour(&mut self, intruding: &AdvancedXpUnit, topic_id: &str) -> Option<String> {
        if self.detour_stack.len() >= self.policies.max_intrusion_detours {
            tracing::warn!(
                content_id = %intruding.content_id,
                topic_id = topic_id,
                depth = self.detour_stack.len(),
                "Detour stack saturated; intrusion recorded without a detour"
            );
            return None;
        }

        let historical_id = self
            .most_similar_historical(intruding, topic_id)
            .unwrap_or_else(|| intruding.content_id.clone());
        let return_to = self
            .return_anchor(intruding, topic_id)
            .unwrap_or_else(|| topic_id.to_string());

        let mut flashbulb = AdvancedXpUnit::create_flashbulb_capsule(
            &intruding.content,
            &historical_id,
            &return_to,
            intruding.affect,
            &self.space,
            &self.policies,
        );
        flashbulb.thread_id = intruding.thread_id.clone();
        flashbulb.topic_id = Some(topic_id.to_string());
        let flashbulb_id = flashbulb.content_id.clone();

        self.detour_stack.push(DetourFrame {
            flashbulb_id: flashbulb_id.clone(),
            intruding_id: intruding.content_id.clone(),
            topic_id: topic_id.to_string(),
            return_to,
            remaining_ttl: self.policies.return_path_ttl,
            opened_at: Utc::now(),
        });
        self.xpunits.insert(flashbulb_id.clone(), flashbulb);

        tracing::info!(
            flashbulb_id = %flashbulb_id,
            historical_id = %historical_id,
            depth = self.detour_stack.len(),
            "Opened flashbulb detour"
        );
        Some(flashbulb_id)
    }

    /// Most similar stored memory outside the interrupted topic
    fn most_similar_historical(&self, intruding: &AdvancedXpUnit, topic_id: &str) -> Option<String> {
        let topic = self.topic_buffers.get(topic_id);
        self.xpunits
            .values()
            .filter(|u| u.content_id != intruding.content_id && !u.is_flashbulb())
            .filter(|u| topic.is_none_or(|t| !t.contains(&u.content_id)))
            .map(|u| (u, cosine_similarity(&u.context_vec, &intruding.context_vec)))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.content_id.cmp(&a.0.content_id)))
            .map(|(u, _)| u.content_id.clone())
    }

    /// Latest non-intrusive member of the topic
    fn return_anchor(&self, intruding: &AdvancedXpUnit, topic_id: &str) -> Option<String> {
        let topic = self.topic_buffers.get(topic_id)?;
        topic
            .capsule_ids
            .iter()
            .filter(|id| **id != intruding.content_id)
            .filter_map(|id| self.xpunits.get(id))
            .filter(|u| !u.has_intrusion_link(topic_id) && !u.is_flashbulb())
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.content_id.cmp(&b.content_id)))
            .map(|u| u.content_id.clone())
    }

    /// Decrement every frame and close the expired ones. Returns how many closed.
    pub(super) fn tick_detours(&mut self) -> usize {
        let before = self.detour_stack.len();
        self.detour_stack.retain_mut(|frame| {
            frame.remaining_ttl = frame.remaining_ttl.saturating_sub(1);
            frame.remaining_ttl > 0
        });
        before - self.detour_stack.len()
    }

    /// Whether an open detour pins `content_id`
    pub(super) fn is_pinned(&self, content_id: &str) -> bool {
        self.detour_stack.iter().any(|f| f.pins(content_id))
    }
}
