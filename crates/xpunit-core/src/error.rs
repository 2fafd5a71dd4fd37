//! Error types for the memory core
//!
//! Only conditions that would silently corrupt state are errors here.
//! "I don't remember that" is an `Option`, and numeric drift is corrected by
//! the safeguard pass, so neither shows up in this enum.

/// Errors surfaced by the memory core
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum XpError {
    /// A vector did not match the configured HRR dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A policy value is outside its meaningful range
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
    /// A serialized record could not be turned back into a unit or snapshot
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Core result type
pub type Result<T> = std::result::Result<T, XpError>;

/// Fail fast when a vector does not have the expected dimensionality.
pub(crate) fn ensure_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(XpError::DimensionMismatch { expected, actual })
    }
}
