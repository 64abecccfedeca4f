//! Full PGMap snapshot codec
//!
//! Only raw entity state and the version/watermarks are persisted. The
//! aggregates, the creating set and the seen set are soft state and are
//! rebuilt from the entity maps on decode.

use crate::config::PgMapConfig;
use crate::error::Result;
use crate::pgmap::PgMap;
use crate::store::EntityStore;
use crate::types::{OsdId, OsdStat, PgId, PgStat};
use bytes::{Buf, BufMut, Bytes};
use denc::{
    decode_exact, encode_to_bytes, impl_denc_for_versioned, Denc, DencError, Epoch, Version,
    VersionedEncode,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl VersionedEncode for PgMap {
    const TYPE_NAME: &'static str = "PgMap";
    const VERSION: u8 = 1;
    const COMPAT: u8 = 1;

    fn encode_content<B: BufMut>(&self, buf: &mut B) -> std::result::Result<(), DencError> {
        self.version.encode(buf)?;
        self.store.pg_stats().encode(buf)?;
        self.store.osd_stats().encode(buf)?;
        self.last_osdmap_epoch.encode(buf)?;
        self.last_pg_scan.encode(buf)
    }

    fn decode_content<B: Buf>(buf: &mut B, _struct_v: u8) -> std::result::Result<Self, DencError> {
        let version = Version::decode(buf)?;
        let pg_stat = BTreeMap::<PgId, PgStat>::decode(buf)?;
        let osd_stat = BTreeMap::<OsdId, OsdStat>::decode(buf)?;
        let last_osdmap_epoch = Epoch::decode(buf)?;
        let last_pg_scan = Epoch::decode(buf)?;

        let mut store = EntityStore::new();
        for (pgid, stat) in pg_stat {
            store.upsert_pg(pgid, stat);
        }
        for (osd, stat) in osd_stat {
            store.upsert_osd(osd, stat);
        }

        let mut map = PgMap {
            version,
            last_osdmap_epoch,
            last_pg_scan,
            store,
            ..Default::default()
        };
        map.rebuild_stats();
        Ok(map)
    }

    fn encoded_size_content(&self) -> Option<usize> {
        Some(
            self.version.encoded_size()?
                + self.store.pg_stats().encoded_size()?
                + self.store.osd_stats().encoded_size()?
                + self.last_osdmap_epoch.encoded_size()?
                + self.last_pg_scan.encoded_size()?,
        )
    }
}

impl_denc_for_versioned!(PgMap);

impl PgMap {
    /// Serialize the full map for the persistence layer
    pub fn encode_snapshot(&self) -> Result<Bytes> {
        let bytes = encode_to_bytes(self)?;
        debug!(
            "PGMap encoded v{}: {} pgs, {} osds, {} bytes",
            self.version,
            self.store.num_pgs(),
            self.store.num_osds(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Decode a snapshot into a new map with default configuration
    pub fn decode_snapshot(data: &[u8]) -> Result<Self> {
        Self::decode_snapshot_with_config(data, PgMapConfig::default())
    }

    /// Decode a snapshot into a new map
    ///
    /// The whole input must be consumed. With
    /// `mon_pgmap_verify_aggregates` set, the rebuilt aggregates are checked
    /// before the map is returned.
    pub fn decode_snapshot_with_config(data: &[u8], config: PgMapConfig) -> Result<Self> {
        let mut map: PgMap = decode_exact(data)?;
        map.config = config;
        if map.config.mon_pgmap_verify_aggregates {
            map.check_consistency()?;
        }
        debug!(
            "PGMap decoded v{}: {} pgs, {} osds",
            map.version,
            map.store.num_pgs(),
            map.store.num_osds()
        );
        Ok(map)
    }

    /// Replace this map with the decoded snapshot
    ///
    /// On error `self` is left exactly as it was.
    pub fn load_snapshot(&mut self, data: &[u8]) -> Result<()> {
        let loaded = Self::decode_snapshot_with_config(data, self.config.clone())?;
        info!(
            "PGMap loaded snapshot v{} (was v{})",
            loaded.version, self.version
        );
        *self = loaded;
        Ok(())
    }
}
