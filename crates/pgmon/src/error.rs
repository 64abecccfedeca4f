//! Error types for the PGMap monitor service

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgMonError {
    #[error("PGMap error: {0}")]
    PgMap(#[from] pgmap::PgMapError),

    #[error("Config error: {0}")]
    Config(#[from] cephconfig::ConfigError),

    #[error("Timed out after {0:?} waiting for PGMap v{1}")]
    Timeout(Duration, u64),
}
