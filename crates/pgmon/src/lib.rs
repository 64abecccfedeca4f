//! PGMap monitor service
//!
//! Wraps a [`pgmap::PgMap`] for use from async code. The monitor owns the
//! only writable copy of the map, serializes every mutation behind a write
//! lock and publishes a [`pgmap::PgMapSummary`] to subscribers after each
//! applied version.

pub mod error;
pub mod monitor;

pub use error::PgMonError;
pub use monitor::PgMapMonitor;

pub type Result<T> = std::result::Result<T, PgMonError>;
