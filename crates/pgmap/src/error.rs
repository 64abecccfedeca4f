//! Error types for PGMap operations

use denc::{DencError, Version};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PgMapError {
    /// An incremental arrived out of sequence. The map was not modified.
    #[error("PGMap version mismatch: at v{current}, expected v{expected}, got v{got}")]
    VersionMismatch {
        current: Version,
        expected: Version,
        got: Version,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DencError),

    /// Incrementally maintained aggregates disagree with a full recompute
    #[error("Aggregate stats inconsistent: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, PgMapError>;
