//! Raw per-entity state: PG stats, OSD stats and the set of every PG ever seen
//!
//! The store never touches aggregates. Callers pair each mutation with the
//! matching [`AggregateStats`](crate::stats::AggregateStats) call.

use crate::types::{OsdId, OsdStat, PgId, PgStat};
use std::collections::{btree_map, BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    pg_stat: BTreeMap<PgId, PgStat>,
    osd_stat: BTreeMap<OsdId, OsdStat>,
    /// Every PG id ever given a stat. Only grows.
    pg_set: BTreeSet<PgId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `stat` for `pgid`, returning the record it replaced
    pub fn upsert_pg(&mut self, pgid: PgId, stat: PgStat) -> Option<PgStat> {
        self.pg_set.insert(pgid);
        self.pg_stat.insert(pgid, stat)
    }

    /// Store `stat` for `osd`, returning the record it replaced
    pub fn upsert_osd(&mut self, osd: OsdId, stat: OsdStat) -> Option<OsdStat> {
        self.osd_stat.insert(osd, stat)
    }

    /// Remove `osd`, returning its last record. Absent ids are a no-op.
    pub fn remove_osd(&mut self, osd: OsdId) -> Option<OsdStat> {
        self.osd_stat.remove(&osd)
    }

    pub fn pg(&self, pgid: &PgId) -> Option<&PgStat> {
        self.pg_stat.get(pgid)
    }

    pub fn osd(&self, osd: &OsdId) -> Option<&OsdStat> {
        self.osd_stat.get(osd)
    }

    pub fn pgs(&self) -> btree_map::Iter<'_, PgId, PgStat> {
        self.pg_stat.iter()
    }

    pub fn osds(&self) -> btree_map::Iter<'_, OsdId, OsdStat> {
        self.osd_stat.iter()
    }

    pub fn pg_stats(&self) -> &BTreeMap<PgId, PgStat> {
        &self.pg_stat
    }

    pub fn osd_stats(&self) -> &BTreeMap<OsdId, OsdStat> {
        &self.osd_stat
    }

    pub fn num_pgs(&self) -> usize {
        self.pg_stat.len()
    }

    pub fn num_osds(&self) -> usize {
        self.osd_stat.len()
    }

    pub fn has_seen(&self, pgid: &PgId) -> bool {
        self.pg_set.contains(pgid)
    }

    pub fn seen_pgs(&self) -> &BTreeSet<PgId> {
        &self.pg_set
    }
}
