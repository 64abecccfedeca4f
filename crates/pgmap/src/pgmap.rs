//! The monitor's PGMap and its incremental apply engine
//!
//! `PgMap` owns the raw per-entity state and the aggregates derived from it.
//! Aggregates are updated in place on every apply, never recomputed, so the
//! cost of an apply is proportional to the size of the incremental rather
//! than the size of the cluster.

use crate::config::PgMapConfig;
use crate::error::{PgMapError, Result};
use crate::incremental::PgMapIncremental;
use crate::stats::{AggregateStats, CreatingPgs, PgMapSummary};
use crate::store::EntityStore;
use crate::types::{OsdId, OsdStat, PgId, PgState, PgStat};
use denc::{Epoch, Version};
use tracing::{debug, error, info, trace};

#[derive(Debug, Clone, Default)]
pub struct PgMap {
    pub(crate) version: Version,
    pub(crate) last_osdmap_epoch: Epoch,
    pub(crate) last_pg_scan: Epoch,
    pub(crate) store: EntityStore,
    pub(crate) stats: AggregateStats,
    pub(crate) config: PgMapConfig,
}

impl PgMap {
    /// Empty map at version 0
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PgMapConfig) -> Self {
        PgMap {
            config,
            ..Default::default()
        }
    }

    /// Apply the next incremental in sequence
    ///
    /// `inc.version` must be exactly one past the current version. On a
    /// mismatch the map is left untouched and `VersionMismatch` is returned;
    /// the caller is expected to treat it as fatal.
    ///
    /// Within one incremental, PG updates are applied first, then OSD
    /// updates, then OSD removals, so an OSD both updated and removed ends up
    /// removed.
    pub fn apply_incremental(&mut self, inc: &PgMapIncremental) -> Result<()> {
        if self.version.checked_add(1) != Some(inc.version) {
            let err = PgMapError::VersionMismatch {
                current: self.version,
                expected: self.version.saturating_add(1),
                got: inc.version,
            };
            error!("PGMap apply_incremental: {}", err);
            return Err(err);
        }

        debug!(
            "PGMap applying v{}: {} pg updates, {} osd updates, {} osd removals",
            inc.version,
            inc.pg_stat_updates.len(),
            inc.osd_stat_updates.len(),
            inc.osd_stat_rm.len()
        );

        self.version = inc.version;

        for (&pgid, &stat) in &inc.pg_stat_updates {
            self.stat_pg_update(pgid, stat);
        }

        for (&osd, &stat) in &inc.osd_stat_updates {
            self.stat_osd_update(osd, stat);
        }

        for &osd in &inc.osd_stat_rm {
            match self.store.remove_osd(osd) {
                Some(old) => {
                    trace!("  {} removed", osd);
                    self.stats.sub_osd(&old);
                }
                None => trace!("  {} not present, ignoring removal", osd),
            }
        }

        if inc.osdmap_epoch != 0 {
            self.last_osdmap_epoch = inc.osdmap_epoch;
        }
        if inc.pg_scan != 0 {
            self.last_pg_scan = inc.pg_scan;
        }

        if self.config.mon_pgmap_verify_aggregates {
            self.check_consistency()?;
        }

        if self.config.summary_due(self.version) {
            info!("pgmap {}", self.summary());
        }

        Ok(())
    }

    fn stat_pg_update(&mut self, pgid: PgId, stat: PgStat) {
        if let Some(old) = self.store.upsert_pg(pgid, stat) {
            trace!("  pg {} {} -> {}", pgid, old.state, stat.state);
            self.stats.sub_pg(pgid, &old);
        } else {
            trace!("  pg {} new {}", pgid, stat.state);
        }
        self.stats.add_pg(pgid, &stat);
    }

    fn stat_osd_update(&mut self, osd: OsdId, stat: OsdStat) {
        if let Some(old) = self.store.upsert_osd(osd, stat) {
            trace!("  {} {} -> {} kb used", osd, old.kb_used, stat.kb_used);
            self.stats.sub_osd(&old);
        } else {
            trace!("  {} new, {} kb", osd, stat.kb);
        }
        self.stats.add_osd(&stat);
    }

    /// Aggregates computed from scratch over the current entity state
    pub fn recompute_stats(&self) -> AggregateStats {
        let mut stats = AggregateStats::new();
        replay(&self.store, &mut stats);
        stats
    }

    /// Reset the aggregates and replay every entity into them
    pub(crate) fn rebuild_stats(&mut self) {
        self.stats.reset();
        replay(&self.store, &mut self.stats);
    }

    /// Compare the maintained aggregates against a full recompute
    pub fn check_consistency(&self) -> Result<()> {
        let expected = self.recompute_stats();
        if expected != self.stats {
            let msg = format!(
                "v{}: maintained {:?}, recomputed {:?}",
                self.version, self.stats, expected
            );
            error!("PGMap aggregate drift at {}", msg);
            return Err(PgMapError::Inconsistent(msg));
        }

        if let Some(pgid) = self
            .store
            .pgs()
            .map(|(pgid, _)| pgid)
            .find(|pgid| !self.store.has_seen(pgid))
        {
            let msg = format!("v{}: pg {} present but never recorded as seen", self.version, pgid);
            error!("PGMap {}", msg);
            return Err(PgMapError::Inconsistent(msg));
        }

        Ok(())
    }

    pub fn summary(&self) -> PgMapSummary {
        PgMapSummary::new(
            self.version,
            self.last_osdmap_epoch,
            self.last_pg_scan,
            &self.stats,
        )
    }

    // ============= Accessors =============

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn last_osdmap_epoch(&self) -> Epoch {
        self.last_osdmap_epoch
    }

    pub fn last_pg_scan(&self) -> Epoch {
        self.last_pg_scan
    }

    pub fn config(&self) -> &PgMapConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    pub fn pg_stat(&self, pgid: &PgId) -> Option<&PgStat> {
        self.store.pg(pgid)
    }

    pub fn osd_stat(&self, osd: &OsdId) -> Option<&OsdStat> {
        self.store.osd(osd)
    }

    pub fn creating_pgs(&self) -> &CreatingPgs {
        self.stats.creating_pgs()
    }

    pub fn num_pg(&self) -> i64 {
        self.stats.num_pg()
    }

    pub fn num_pg_in_state(&self, state: PgState) -> i64 {
        self.stats.num_pg_in_state(state)
    }

    pub fn num_osd(&self) -> i64 {
        self.stats.num_osd()
    }

    pub fn total_kb(&self) -> i64 {
        self.stats.total_kb()
    }

    pub fn total_used_kb(&self) -> i64 {
        self.stats.total_used_kb()
    }

    pub fn total_avail_kb(&self) -> i64 {
        self.stats.total_avail_kb()
    }
}

fn replay(store: &EntityStore, stats: &mut AggregateStats) {
    for (&pgid, stat) in store.pgs() {
        stats.add_pg(pgid, stat);
    }
    for (_, stat) in store.osds() {
        stats.add_osd(stat);
    }
}
