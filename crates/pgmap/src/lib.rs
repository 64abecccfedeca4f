//! Monitor-side PGMap
//!
//! Tracks the latest stats reported for every placement group and OSD and
//! keeps cluster-wide totals derived from them.
//!
//! # Architecture
//!
//! - `PgMap`: owns the entity state and applies `PgMapIncremental`s in
//!   strict version order
//! - `EntityStore`: raw per-PG and per-OSD records
//! - `AggregateStats`: totals maintained incrementally (sub old, add new)
//! - Snapshot codec: persists raw state only, aggregates are rebuilt on load

pub mod config;
pub mod error;
pub mod incremental;
pub mod pgmap;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::PgMapConfig;
pub use error::{PgMapError, Result};
pub use incremental::PgMapIncremental;
pub use pgmap::PgMap;
pub use stats::{AggregateStats, CreatingPgs, PgMapSummary};
pub use store::EntityStore;
pub use types::{OsdId, OsdStat, PgId, PgState, PgStat};
