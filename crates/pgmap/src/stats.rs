//! Cluster-wide aggregate stats (soft state)
//!
//! Aggregates are maintained incrementally: every entity transition is a
//! `sub` of the old record followed by an `add` of the new one. They are
//! never persisted and are only recomputed from scratch on snapshot load.

use crate::types::{OsdStat, PgId, PgState, PgStat};
use denc::{Epoch, Version};
use serde::Serialize;
use std::collections::{btree_set, BTreeMap, BTreeSet};
use std::fmt;

/// PGs whose current state has the `CREATING` bit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatingPgs {
    pgs: BTreeSet<PgId>,
}

impl CreatingPgs {
    fn insert(&mut self, pgid: PgId) {
        self.pgs.insert(pgid);
    }

    fn remove(&mut self, pgid: &PgId) {
        self.pgs.remove(pgid);
    }

    fn clear(&mut self) {
        self.pgs.clear();
    }

    pub fn contains(&self, pgid: &PgId) -> bool {
        self.pgs.contains(pgid)
    }

    pub fn len(&self) -> usize {
        self.pgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pgs.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, PgId> {
        self.pgs.iter()
    }
}

impl<'a> IntoIterator for &'a CreatingPgs {
    type Item = &'a PgId;
    type IntoIter = btree_set::Iter<'a, PgId>;

    fn into_iter(self) -> Self::IntoIter {
        self.pgs.iter()
    }
}

/// Running totals over every PG and OSD currently in the store
///
/// Totals wrap on overflow like the monitor's `int64_t` counters, which keeps
/// `sub_*` the exact inverse of `add_*` for any input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    num_pg: i64,
    /// Keyed by raw state bits; buckets that drop to zero are removed
    num_pg_by_state: BTreeMap<u32, i64>,
    total_pg_num_bytes: i64,
    total_pg_num_kb: i64,
    total_pg_num_objects: i64,

    num_osd: i64,
    total_osd_kb: i64,
    total_osd_kb_used: i64,
    total_osd_kb_avail: i64,
    total_osd_num_objects: i64,

    creating_pgs: CreatingPgs,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter and clear the creating set
    pub fn reset(&mut self) {
        self.num_pg = 0;
        self.num_pg_by_state.clear();
        self.total_pg_num_bytes = 0;
        self.total_pg_num_kb = 0;
        self.total_pg_num_objects = 0;
        self.num_osd = 0;
        self.total_osd_kb = 0;
        self.total_osd_kb_used = 0;
        self.total_osd_kb_avail = 0;
        self.total_osd_num_objects = 0;
        self.creating_pgs.clear();
    }

    pub fn add_pg(&mut self, pgid: PgId, stat: &PgStat) {
        self.num_pg = self.num_pg.wrapping_add(1);
        let bucket = self.num_pg_by_state.entry(stat.state.bits()).or_insert(0);
        *bucket = bucket.wrapping_add(1);
        self.total_pg_num_bytes = self.total_pg_num_bytes.wrapping_add(stat.num_bytes);
        self.total_pg_num_kb = self.total_pg_num_kb.wrapping_add(stat.num_kb);
        self.total_pg_num_objects = self.total_pg_num_objects.wrapping_add(stat.num_objects);
        if stat.is_creating() {
            self.creating_pgs.insert(pgid);
        }
    }

    /// Exact inverse of [`add_pg`](Self::add_pg)
    pub fn sub_pg(&mut self, pgid: PgId, stat: &PgStat) {
        self.num_pg = self.num_pg.wrapping_sub(1);
        let key = stat.state.bits();
        let bucket = self.num_pg_by_state.entry(key).or_insert(0);
        *bucket = bucket.wrapping_sub(1);
        if *bucket == 0 {
            self.num_pg_by_state.remove(&key);
        }
        self.total_pg_num_bytes = self.total_pg_num_bytes.wrapping_sub(stat.num_bytes);
        self.total_pg_num_kb = self.total_pg_num_kb.wrapping_sub(stat.num_kb);
        self.total_pg_num_objects = self.total_pg_num_objects.wrapping_sub(stat.num_objects);
        if stat.is_creating() {
            self.creating_pgs.remove(&pgid);
        }
    }

    pub fn add_osd(&mut self, stat: &OsdStat) {
        self.num_osd = self.num_osd.wrapping_add(1);
        self.total_osd_kb = self.total_osd_kb.wrapping_add(stat.kb);
        self.total_osd_kb_used = self.total_osd_kb_used.wrapping_add(stat.kb_used);
        self.total_osd_kb_avail = self.total_osd_kb_avail.wrapping_add(stat.kb_avail);
        self.total_osd_num_objects = self.total_osd_num_objects.wrapping_add(stat.num_objects);
    }

    /// Exact inverse of [`add_osd`](Self::add_osd)
    pub fn sub_osd(&mut self, stat: &OsdStat) {
        self.num_osd = self.num_osd.wrapping_sub(1);
        self.total_osd_kb = self.total_osd_kb.wrapping_sub(stat.kb);
        self.total_osd_kb_used = self.total_osd_kb_used.wrapping_sub(stat.kb_used);
        self.total_osd_kb_avail = self.total_osd_kb_avail.wrapping_sub(stat.kb_avail);
        self.total_osd_num_objects = self.total_osd_num_objects.wrapping_sub(stat.num_objects);
    }

    // ============= Queries =============

    pub fn num_pg(&self) -> i64 {
        self.num_pg
    }

    /// Number of PGs whose state is exactly `state`
    pub fn num_pg_in_state(&self, state: PgState) -> i64 {
        self.num_pg_by_state
            .get(&state.bits())
            .copied()
            .unwrap_or(0)
    }

    pub fn num_pg_by_state(&self) -> impl Iterator<Item = (PgState, i64)> + '_ {
        self.num_pg_by_state
            .iter()
            .map(|(bits, count)| (PgState::from_bits_retain(*bits), *count))
    }

    pub fn total_pg_num_bytes(&self) -> i64 {
        self.total_pg_num_bytes
    }

    pub fn total_pg_num_kb(&self) -> i64 {
        self.total_pg_num_kb
    }

    pub fn total_pg_num_objects(&self) -> i64 {
        self.total_pg_num_objects
    }

    pub fn num_osd(&self) -> i64 {
        self.num_osd
    }

    /// Total raw capacity across OSDs, in KB
    pub fn total_kb(&self) -> i64 {
        self.total_osd_kb
    }

    pub fn total_used_kb(&self) -> i64 {
        self.total_osd_kb_used
    }

    pub fn total_avail_kb(&self) -> i64 {
        self.total_osd_kb_avail
    }

    pub fn total_osd_num_objects(&self) -> i64 {
        self.total_osd_num_objects
    }

    pub fn creating_pgs(&self) -> &CreatingPgs {
        &self.creating_pgs
    }
}

/// Point-in-time copy of the query surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PgMapSummary {
    pub version: Version,
    pub last_osdmap_epoch: Epoch,
    pub last_pg_scan: Epoch,
    pub num_pg: i64,
    pub num_pg_by_state: BTreeMap<String, i64>,
    pub num_pg_creating: usize,
    pub total_pg_num_bytes: i64,
    pub total_pg_num_kb: i64,
    pub total_pg_num_objects: i64,
    pub num_osd: i64,
    pub total_kb: i64,
    pub total_used_kb: i64,
    pub total_avail_kb: i64,
    pub total_osd_num_objects: i64,
}

impl PgMapSummary {
    pub(crate) fn new(
        version: Version,
        last_osdmap_epoch: Epoch,
        last_pg_scan: Epoch,
        stats: &AggregateStats,
    ) -> Self {
        PgMapSummary {
            version,
            last_osdmap_epoch,
            last_pg_scan,
            num_pg: stats.num_pg(),
            num_pg_by_state: stats
                .num_pg_by_state()
                .map(|(state, count)| (state.to_string(), count))
                .collect(),
            num_pg_creating: stats.creating_pgs().len(),
            total_pg_num_bytes: stats.total_pg_num_bytes(),
            total_pg_num_kb: stats.total_pg_num_kb(),
            total_pg_num_objects: stats.total_pg_num_objects(),
            num_osd: stats.num_osd(),
            total_kb: stats.total_kb(),
            total_used_kb: stats.total_used_kb(),
            total_avail_kb: stats.total_avail_kb(),
            total_osd_num_objects: stats.total_osd_num_objects(),
        }
    }
}

/// `v12: 3 pgs: 2 active+clean, 1 creating; 150 KB data, 40 KB used, 960 / 1000 KB avail`
impl fmt::Display for PgMapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}: {} pgs:", self.version, self.num_pg)?;
        for (i, (state, count)) in self.num_pg_by_state.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{} {}", sep, count, state)?;
        }
        write!(
            f,
            "; {} KB data, {} KB used, {} / {} KB avail",
            self.total_pg_num_kb, self.total_used_kb, self.total_avail_kb, self.total_kb
        )
    }
}
