//! # XPUnit Core
//!
//! Associative memory core built on Holographic Reduced Representations.
//! Every memory is an XPUnit: text, a (valence, arousal) affect, an HRR
//! role-filler capsule and lifecycle metadata.
//!
//! - **HRR Binding**: circular convolution via FFT, superposition, clean-up memory
//! - **Affect Dynamics**: mood-congruent reinforcement, emotional decay resistance
//! - **Consolidation Lifecycle**: episodic → consolidating → consolidated → remote,
//!   driven by rehearsal and never moving backward
//! - **Intrusion Detection**: emotionally loud, off-topic memories open a
//!   TTL-bounded flashbulb detour with a guaranteed return path
//! - **Narrative Tracking**: threads and slowly drifting topic centers
//! - **Safeguards**: on-demand bounds for runaway affect, salience and detours
//!
//! The core is a deterministic, synchronous, in-memory data structure. It
//! performs no I/O: persistence goes through [`EnvironmentSnapshot`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xpunit_core::prelude::*;
//!
//! let mut env = AdvancedXpEnvironment::with_policies(XpUnitPolicies::default())?;
//!
//! let id = env
//!     .ingest_experience("Reviewing the quarterly budget", "thread-1", "budget")
//!     .content_id
//!     .clone();
//! env.ingest_experience("I still think about the accident, I was terrified", "thread-1", "budget");
//!
//! if let Some(unit) = env.recall_experience(&id) {
//!     println!("{} rehearsals, stage {}", unit.rehearsals, unit.consolidation);
//! }
//!
//! env.consolidate_memories(0.92);
//! env.apply_runaway_affect_safeguards();
//! let stats = env.get_comprehensive_statistics();
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod affect;
pub mod consciousness;
pub mod environment;
pub mod error;
pub mod hrr;
pub mod memory;
pub mod narrative;
pub mod policy;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use affect::{
    base_decay, effective_retention, emotional_resistance, AffectAppraiser, AffectState,
    AppraisalResult,
};
pub use consciousness::{
    ConsciousnessLevel, ConsciousnessReport, ConsciousnessScorer, IndicatorPattern,
    MomentumConfig, MomentumScorer, PatternScorer,
};
pub use environment::{
    AdvancedXpEnvironment, ConsolidationReport, DetourFrame, EnvironmentSnapshot,
    EnvironmentStatistics, MergeRecord, RecallHit, SafeguardReport,
};
pub use error::{Result, XpError};
pub use hrr::{cosine_similarity, Binding, HrrSpace, MemoryCapsule};
pub use memory::{
    AdvancedXpUnit, CapsuleLink, ConsolidationStage, IntrusionAssessment, LinkType,
    ReinforcementOutcome,
};
pub use narrative::{NarrativeCapsule, TopicBuffer};
pub use policy::XpUnitPolicies;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AdvancedXpEnvironment, AdvancedXpUnit, AffectState, CapsuleLink, ConsciousnessScorer,
        ConsolidationStage, EnvironmentSnapshot, EnvironmentStatistics, LinkType, Result,
        XpError, XpUnitPolicies,
    };
}
