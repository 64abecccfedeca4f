//! Little-endian binary encoding for PGMap state
//!
//! Provides the [`Denc`] trait, the [`VersionedEncode`] envelope used by every
//! persisted struct, and the epoch/version aliases shared across crates.

pub mod denc;
pub mod error;
pub mod types;

pub use denc::*;
pub use error::*;
pub use types::*;
