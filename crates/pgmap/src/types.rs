//! Per-entity stat records reported to the monitor
//!
//! Records are plain values: an update replaces the whole record, it never
//! patches individual fields.

use bytes::{Buf, BufMut};
use denc::{impl_denc_for_versioned, Denc, DencError, FixedSize, VersionedEncode};
use std::fmt;

/// Placement group id (pg_t)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PgId {
    /// Pool ID
    pub pool: u64,
    /// PG seed/number within the pool
    pub seed: u32,
}

impl PgId {
    pub const fn new(pool: u64, seed: u32) -> Self {
        PgId { pool, seed }
    }
}

impl fmt::Display for PgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:x}", self.pool, self.seed)
    }
}

/// Wire format: `u8 version (1)`, `u64 pool`, `u32 seed`, `i32 preferred`.
/// `preferred` is always written as -1 and ignored on decode.
impl Denc for PgId {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        1u8.encode(buf)?;
        self.pool.encode(buf)?;
        self.seed.encode(buf)?;
        (-1i32).encode(buf)
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
        let version = u8::decode(buf)?;
        if version != 1 {
            return Err(DencError::UnsupportedVersion {
                what: "PgId",
                version,
                compat: version,
                supported: 1,
            });
        }
        let pool = u64::decode(buf)?;
        let seed = u32::decode(buf)?;
        let _preferred = i32::decode(buf)?;
        Ok(PgId { pool, seed })
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(Self::SIZE)
    }
}

impl FixedSize for PgId {
    const SIZE: usize = 17;
}

/// OSD id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsdId(pub i32);

impl fmt::Display for OsdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "osd.{}", self.0)
    }
}

impl Denc for OsdId {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        self.0.encode(buf)
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DencError> {
        i32::decode(buf).map(OsdId)
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(Self::SIZE)
    }
}

impl FixedSize for OsdId {
    const SIZE: usize = 4;
}

bitflags::bitflags! {
    /// PG lifecycle state bits
    ///
    /// Only `CREATING` is interpreted by the aggregate tracker; every other
    /// bit, named or not, is carried through untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PgState: u32 {
        /// PG is being created
        const CREATING = 1 << 0;
        /// Primary and replicas are active
        const ACTIVE = 1 << 1;
        /// Peers are complete, no stray replicas
        const CLEAN = 1 << 2;
        /// All replicas went down
        const CRASHED = 1 << 3;
        /// Crashed, waiting for replay
        const REPLAY = 1 << 4;
        /// Must notify the primary it exists
        const STRAY = 1 << 5;
        /// PG is splitting
        const SPLITTING = 1 << 6;

        const _ = !0;
    }
}

impl Default for PgState {
    fn default() -> Self {
        PgState::empty()
    }
}

impl PgState {
    const NAMES: [(PgState, &'static str); 7] = [
        (PgState::CREATING, "creating"),
        (PgState::ACTIVE, "active"),
        (PgState::CLEAN, "clean"),
        (PgState::CRASHED, "crashed"),
        (PgState::REPLAY, "replay"),
        (PgState::STRAY, "stray"),
        (PgState::SPLITTING, "splitting"),
    ];
}

/// Renders `active+clean` style strings. Bits without a name are shown in hex.
impl fmt::Display for PgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("unknown");
        }

        let mut rest = self.bits();
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
                rest &= !flag.bits();
            }
        }
        if rest != 0 {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "0x{:x}", rest)?;
        }
        Ok(())
    }
}

/// Latest statistics reported for one placement group (pg_stat_t)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PgStat {
    pub state: PgState,
    pub num_bytes: i64,
    pub num_kb: i64,
    pub num_objects: i64,
}

impl PgStat {
    pub fn new(state: PgState, num_bytes: i64, num_kb: i64, num_objects: i64) -> Self {
        PgStat {
            state,
            num_bytes,
            num_kb,
            num_objects,
        }
    }

    pub fn is_creating(&self) -> bool {
        self.state.contains(PgState::CREATING)
    }
}

impl VersionedEncode for PgStat {
    const TYPE_NAME: &'static str = "PgStat";
    const VERSION: u8 = 1;
    const COMPAT: u8 = 1;

    fn encode_content<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        self.state.bits().encode(buf)?;
        self.num_bytes.encode(buf)?;
        self.num_kb.encode(buf)?;
        self.num_objects.encode(buf)
    }

    fn decode_content<B: Buf>(buf: &mut B, _struct_v: u8) -> Result<Self, DencError> {
        Ok(PgStat {
            state: PgState::from_bits_retain(u32::decode(buf)?),
            num_bytes: i64::decode(buf)?,
            num_kb: i64::decode(buf)?,
            num_objects: i64::decode(buf)?,
        })
    }

    fn encoded_size_content(&self) -> Option<usize> {
        Some(4 + 3 * 8)
    }
}

impl_denc_for_versioned!(PgStat);

/// Latest capacity and utilization reported by one OSD (osd_stat_t)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OsdStat {
    pub kb: i64,
    pub kb_used: i64,
    pub kb_avail: i64,
    pub num_objects: i64,
}

impl OsdStat {
    pub fn new(kb: i64, kb_used: i64, kb_avail: i64, num_objects: i64) -> Self {
        OsdStat {
            kb,
            kb_used,
            kb_avail,
            num_objects,
        }
    }
}

impl VersionedEncode for OsdStat {
    const TYPE_NAME: &'static str = "OsdStat";
    const VERSION: u8 = 1;
    const COMPAT: u8 = 1;

    fn encode_content<B: BufMut>(&self, buf: &mut B) -> Result<(), DencError> {
        self.kb.encode(buf)?;
        self.kb_used.encode(buf)?;
        self.kb_avail.encode(buf)?;
        self.num_objects.encode(buf)
    }

    fn decode_content<B: Buf>(buf: &mut B, _struct_v: u8) -> Result<Self, DencError> {
        Ok(OsdStat {
            kb: i64::decode(buf)?,
            kb_used: i64::decode(buf)?,
            kb_avail: i64::decode(buf)?,
            num_objects: i64::decode(buf)?,
        })
    }

    fn encoded_size_content(&self) -> Option<usize> {
        Some(4 * 8)
    }
}

impl_denc_for_versioned!(OsdStat);
