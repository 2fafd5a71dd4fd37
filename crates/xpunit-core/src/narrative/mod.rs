//! Narrative structures
//!
//! Both hold weak references (ids) to units owned by the environment:
//! - [`TopicBuffer`]: slowly drifting center of a topic, the intrusion reference
//! - [`NarrativeCapsule`]: ordered record of one conversation thread

mod thread;
mod topic;

pub use thread::NarrativeCapsule;
pub use topic::TopicBuffer;
