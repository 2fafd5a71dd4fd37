//! Memory module - the XPUnit and its edges
//!
//! - [`AdvancedXpUnit`]: the atomic memory unit (text, affect, HRR capsule,
//!   lifecycle metadata) and its update rules
//! - [`CapsuleLink`]: typed, weighted edge between units, optionally transient
//! - [`ConsolidationStage`]: forward-only lifecycle driven by rehearsal count

mod unit;

pub use unit::{AdvancedXpUnit, IntrusionAssessment, ReinforcementOutcome, FLASHBULB_TAG};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::XpUnitPolicies;

// ============================================================================
// CONSOLIDATION STAGE
// ============================================================================

/// Lifecycle phase of a memory. Ordered: a unit's stage only ever increases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationStage {
    /// Fresh, fragile, decays at the base rate
    #[default]
    Episodic,
    /// Rehearsed at least `r1` times
    Consolidating,
    /// Rehearsed at least `r2` times
    Consolidated,
    /// Rehearsed at least `r3` times; slowest decay
    Remote,
}

impl ConsolidationStage {
    /// All stages, in lifecycle order
    pub const ALL: [ConsolidationStage; 4] = [
        ConsolidationStage::Episodic,
        ConsolidationStage::Consolidating,
        ConsolidationStage::Consolidated,
        ConsolidationStage::Remote,
    ];

    /// Position in the lifecycle, 0 for `Episodic`
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Stage implied by a rehearsal count alone
    pub fn from_rehearsals(rehearsals: u32, policies: &XpUnitPolicies) -> Self {
        if rehearsals >= policies.r3 {
            ConsolidationStage::Remote
        } else if rehearsals >= policies.r2 {
            ConsolidationStage::Consolidated
        } else if rehearsals >= policies.r1 {
            ConsolidationStage::Consolidating
        } else {
            ConsolidationStage::Episodic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsolidationStage::Episodic => "episodic",
            ConsolidationStage::Consolidating => "consolidating",
            ConsolidationStage::Consolidated => "consolidated",
            ConsolidationStage::Remote => "remote",
        }
    }
}

impl std::fmt::Display for ConsolidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConsolidationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "episodic" => Ok(ConsolidationStage::Episodic),
            "consolidating" => Ok(ConsolidationStage::Consolidating),
            "consolidated" => Ok(ConsolidationStage::Consolidated),
            "remote" => Ok(ConsolidationStage::Remote),
            _ => Err(format!("Unknown consolidation stage: {}", s)),
        }
    }
}

// ============================================================================
// CAPSULE LINKS
// ============================================================================

/// Type of relationship between units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Emotional association (reinforcement source, flashbulb origin)
    Emotional,
    /// Sequence within a narrative thread or topic
    Narrative,
    /// This unit intruded on the target topic
    Intrusion,
    /// Guaranteed way back from a detour to the interrupted topic
    ReturnPath,
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkType::Emotional => write!(f, "emotional"),
            LinkType::Narrative => write!(f, "narrative"),
            LinkType::Intrusion => write!(f, "intrusion"),
            LinkType::ReturnPath => write!(f, "return_path"),
        }
    }
}

impl std::str::FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emotional" => Ok(LinkType::Emotional),
            "narrative" => Ok(LinkType::Narrative),
            "intrusion" => Ok(LinkType::Intrusion),
            "return_path" | "returnpath" => Ok(LinkType::ReturnPath),
            _ => Err(format!("Unknown link type: {}", s)),
        }
    }
}

/// A directed edge from the owning unit to another unit or topic.
///
/// The target is a reference by id, never ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleLink {
    /// Type of relationship
    pub link_type: LinkType,
    /// Target unit, capsule or topic id
    pub target_id: String,
    /// Strength of the relationship (0-1)
    pub weight: f64,
    /// Affect magnitude that produced the link
    pub affect_spike: f64,
    /// Free-text explanation
    pub reason: String,
    /// Remaining lifetime in ingestions; `None` = permanent
    pub ttl: Option<u32>,
    /// When the link was created
    pub created_at: DateTime<Utc>,
}

impl CapsuleLink {
    /// Create a permanent link. Weight is clamped to [0, 1].
    pub fn new(link_type: LinkType, target_id: impl Into<String>, weight: f64) -> Self {
        Self {
            link_type,
            target_id: target_id.into(),
            weight: if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) },
            affect_spike: 0.0,
            reason: String::new(),
            ttl: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_affect_spike(mut self, affect_spike: f64) -> Self {
        self.affect_spike = affect_spike;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Make the link transient: it is pruned after `ttl` ticks.
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Whether the link expires
    pub fn is_transient(&self) -> bool {
        self.ttl.is_some()
    }

    /// Decrement the TTL. Returns whether the link is still alive.
    pub fn tick(&mut self) -> bool {
        match self.ttl.as_mut() {
            Some(ttl) => {
                *ttl = ttl.saturating_sub(1);
                *ttl > 0
            }
            None => true,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
