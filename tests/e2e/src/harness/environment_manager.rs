//! Environment Harness
//!
//! Wraps an [`AdvancedXpEnvironment`] for journey tests:
//! - A manual clock for deterministic recall and retention checks
//! - Snapshot persistence to a temporary directory
//! - Global invariant checks after arbitrary workloads

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use xpunit_core::{
    AdvancedXpEnvironment, AdvancedXpUnit, AffectState, EnvironmentSnapshot, LinkType, RecallHit,
    XpUnitPolicies,
};

/// Environment under test plus a controllable clock
///
/// # Example
///
/// ```rust,ignore
/// let mut h = EnvironmentHarness::new();
/// let id = h.ingest("checked the garden beds", "diary", "garden", AffectState::neutral());
/// h.advance_hours(24);
/// h.recall(&id);
/// assert!(h.violations().is_empty());
/// ```
pub struct EnvironmentHarness {
    /// The environment
    pub env: AdvancedXpEnvironment,
    clock: DateTime<Utc>,
    /// Created on first persist, kept alive for reloads
    temp_dir: Option<TempDir>,
}

impl EnvironmentHarness {
    /// Harness with default policies
    pub fn new() -> Self {
        Self {
            env: AdvancedXpEnvironment::new(),
            clock: Utc::now(),
            temp_dir: None,
        }
    }

    /// Harness with custom policies
    pub fn with_policies(policies: XpUnitPolicies) -> Self {
        let env =
            AdvancedXpEnvironment::with_policies(policies).expect("test policies must be valid");
        Self {
            env,
            clock: Utc::now(),
            temp_dir: None,
        }
    }

    // ========================================================================
    // CLOCK
    // ========================================================================

    pub fn now(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn advance_hours(&mut self, hours: i64) {
        self.clock += Duration::hours(hours);
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Ingest with an explicit affect and return the new id
    pub fn ingest(&mut self, content: &str, thread: &str, topic: &str, affect: AffectState) -> String {
        self.env
            .ingest_experience_with_affect(content, thread, topic, affect)
            .content_id
            .clone()
    }

    /// Recall at the harness clock
    pub fn recall(&mut self, id: &str) -> Option<&AdvancedXpUnit> {
        let now = self.clock;
        self.env.recall_experience_at(id, now)
    }

    /// Recall `times` times, one hour apart
    pub fn rehearse(&mut self, id: &str, times: u32) {
        for _ in 0..times {
            self.advance_hours(1);
            self.recall(id).expect("rehearsed unit must exist");
        }
    }

    /// Cue search at the harness clock
    pub fn search(&self, cue: &str, limit: usize) -> Vec<RecallHit> {
        self.env.search_experiences(cue, limit, self.clock)
    }

    /// Retention of a unit at the harness clock
    pub fn retention(&self, id: &str) -> f64 {
        self.unit(id).retention_at(self.clock, self.env.policies())
    }

    /// Unit that the test expects to exist
    pub fn unit(&self, id: &str) -> &AdvancedXpUnit {
        self.env
            .unit(id)
            .unwrap_or_else(|| panic!("unit {} should exist", id))
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write the current snapshot to a file in the harness temp dir
    pub fn persist(&mut self) -> PathBuf {
        let dir = self
            .temp_dir
            .get_or_insert_with(|| TempDir::new().expect("Failed to create temp directory"));
        let path = dir.path().join("environment.json");
        let json = self
            .env
            .snapshot()
            .to_json_pretty()
            .expect("snapshot serializes");
        std::fs::write(&path, json).expect("Failed to write snapshot");
        path
    }

    /// Replace the environment with the one stored at `path`
    pub fn reload(&mut self, path: &Path) {
        let json = std::fs::read_to_string(path).expect("Failed to read snapshot");
        let snapshot = EnvironmentSnapshot::from_json(&json).expect("snapshot parses");
        self.env = AdvancedXpEnvironment::restore(snapshot).expect("snapshot restores");
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    /// Global invariants that hold after any sequence of operations.
    ///
    /// Returns a description of every violation found.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let policies = self.env.policies();

        for unit in self.env.units() {
            let id = &unit.content_id;
            if !(-1.0..=1.0).contains(&unit.affect.valence) {
                violations.push(format!("{}: valence {} out of range", id, unit.affect.valence));
            }
            if !(0.0..=1.0).contains(&unit.affect.arousal) {
                violations.push(format!("{}: arousal {} out of range", id, unit.affect.arousal));
            }
            if unit.context_vec.len() != policies.dimension {
                violations.push(format!("{}: context dimension {}", id, unit.context_vec.len()));
            }
            if unit.text_trace.is_empty() {
                violations.push(format!("{}: empty text trace", id));
            }
            for link in &unit.links {
                if !(0.0..=1.0).contains(&link.weight) {
                    violations.push(format!("{}: link weight {}", id, link.weight));
                }
                if link.link_type == LinkType::ReturnPath && link.ttl.is_none() {
                    violations.push(format!("{}: return path without ttl", id));
                }
            }
        }

        for thread in self.env.narrative_capsules() {
            for member in &thread.linked_capsules {
                if self.env.unit(member).is_none() {
                    violations.push(format!("thread {}: dangling {}", thread.thread_id, member));
                }
            }
        }
        for topic in self.env.topic_buffers() {
            for member in &topic.capsule_ids {
                if self.env.unit(member).is_none() {
                    violations.push(format!("topic {}: dangling {}", topic.topic_id, member));
                }
            }
        }

        let detours = self.env.detour_stack();
        if detours.len() > policies.max_intrusion_detours {
            violations.push(format!("detour depth {}", detours.len()));
        }
        for frame in detours {
            if self.env.unit(&frame.flashbulb_id).is_none() {
                violations.push(format!("detour without flashbulb {}", frame.flashbulb_id));
            }
        }

        violations
    }
}

impl Default for EnvironmentHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let mut h = EnvironmentHarness::new();
        let start = h.now();
        h.advance_hours(5);
        assert_eq!(h.now() - start, Duration::hours(5));
    }

    #[test]
    fn test_persist_and_reload() {
        let mut h = EnvironmentHarness::new();
        let id = h.ingest("one small note", "t", "a", AffectState::neutral());
        let path = h.persist();
        h.reload(&path);
        assert_eq!(h.unit(&id).content, "one small note");
        assert!(h.violations().is_empty());
    }
}
