//! PGMap tunables read from ceph.conf

use cephconfig::{define_options, CephConfig, Count};

define_options! {
    /// Monitor-side PGMap options
    pub struct PgMapConfig {
        /// Recompute aggregates from raw entity state after every apply and
        /// decode, failing on drift. Debug clusters only.
        mon_pgmap_verify_aggregates: bool = false,

        /// Log a summary line every N applied versions. Off by default;
        /// per-version detail is at `debug!`.
        mon_pgmap_summary_interval: Count = Count(0),
    }
}

impl PgMapConfig {
    /// Sections consulted, most specific first
    pub const SECTIONS: &'static [&'static str] = &["mon", "global"];

    pub fn load(config: &CephConfig) -> Self {
        Self::from_ceph_config(config, Self::SECTIONS)
    }

    /// Whether a summary should be logged after reaching `version`
    pub(crate) fn summary_due(&self, version: u64) -> bool {
        let interval = self.mon_pgmap_summary_interval.0;
        interval != 0 && version % interval == 0
    }
}
