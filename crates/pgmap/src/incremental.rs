//! PGMap incremental (PGMap::Incremental)
//!
//! One delta in the totally ordered stream the monitor applies. Each
//! incremental names the version it produces; it applies only on top of
//! `version - 1`.

use crate::types::{OsdId, OsdStat, PgId, PgStat};
use bytes::{Buf, BufMut};
use denc::{impl_denc_for_versioned, Denc, DencError, Epoch, Version, VersionedEncode};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgMapIncremental {
    /// Version this incremental produces
    pub version: Version,
    pub pg_stat_updates: BTreeMap<PgId, PgStat>,
    pub osd_stat_updates: BTreeMap<OsdId, OsdStat>,
    /// Applied after `osd_stat_updates`
    pub osd_stat_rm: BTreeSet<OsdId>,
    /// 0 means "unchanged"
    pub osdmap_epoch: Epoch,
    /// 0 means "unchanged"
    pub pg_scan: Epoch,
}

impl PgMapIncremental {
    pub fn new(version: Version) -> Self {
        PgMapIncremental {
            version,
            ..Default::default()
        }
    }

    pub fn update_pg(&mut self, pgid: PgId, stat: PgStat) -> &mut Self {
        self.pg_stat_updates.insert(pgid, stat);
        self
    }

    pub fn update_osd(&mut self, osd: OsdId, stat: OsdStat) -> &mut Self {
        self.osd_stat_updates.insert(osd, stat);
        self
    }

    pub fn remove_osd(&mut self, osd: OsdId) -> &mut Self {
        self.osd_stat_rm.insert(osd);
        self
    }

    pub fn with_osdmap_epoch(mut self, epoch: Epoch) -> Self {
        self.osdmap_epoch = epoch;
        self
    }

    pub fn with_pg_scan(mut self, epoch: Epoch) -> Self {
        self.pg_scan = epoch;
        self
    }

    /// True if applying this would only bump the version
    pub fn is_empty(&self) -> bool {
        self.pg_stat_updates.is_empty()
            && self.osd_stat_updates.is_empty()
            && self.osd_stat_rm.is_empty()
            && self.osdmap_epoch == 0
            && self.pg_scan == 0
    }
}

impl VersionedEncode for PgMapIncremental {
    const TYPE_NAME: &'static str = "PgMapIncremental";
    const VERSION: u8 = 1;
    const COMPAT: u8 = 1;

    fn encode_content<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        self.version.encode(buf)?;
        self.pg_stat_updates.encode(buf)?;
        self.osd_stat_updates.encode(buf)?;
        self.osd_stat_rm.encode(buf)?;
        self.osdmap_epoch.encode(buf)?;
        self.pg_scan.encode(buf)
    }

    fn decode_content<B: Buf>(buf: &mut B, _struct_v: u8) -> Result<Self, DencError> {
        Ok(PgMapIncremental {
            version: Version::decode(buf)?,
            pg_stat_updates: BTreeMap::decode(buf)?,
            osd_stat_updates: BTreeMap::decode(buf)?,
            osd_stat_rm: BTreeSet::decode(buf)?,
            osdmap_epoch: Epoch::decode(buf)?,
            pg_scan: Epoch::decode(buf)?,
        })
    }

    fn encoded_size_content(&self) -> Option<usize> {
        Some(
            self.version.encoded_size()?
                + self.pg_stat_updates.encoded_size()?
                + self.osd_stat_updates.encoded_size()?
                + self.osd_stat_rm.encoded_size()?
                + self.osdmap_epoch.encoded_size()?
                + self.pg_scan.encoded_size()?,
        )
    }
}

impl_denc_for_versioned!(PgMapIncremental);
