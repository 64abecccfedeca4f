//! Snapshot decoding of malformed input and the summary surface

use bytes::{BufMut, BytesMut};
use denc::DencError;
use pgmap::{OsdId, OsdStat, PgId, PgMap, PgMapError, PgMapIncremental, PgState, PgStat};

fn sample_map() -> PgMap {
    let mut map = PgMap::new();

    let mut inc = PgMapIncremental::new(1);
    inc.update_pg(PgId::new(1, 0), PgStat::new(PgState::CREATING, 100, 0, 1))
        .update_osd(OsdId(0), OsdStat::new(1000, 10, 990, 1))
        .update_osd(OsdId(1), OsdStat::new(1000, 30, 970, 2));
    map.apply_incremental(&inc.with_osdmap_epoch(4)).unwrap();

    let mut inc = PgMapIncremental::new(2);
    inc.update_pg(
        PgId::new(1, 0),
        PgStat::new(PgState::ACTIVE | PgState::CLEAN, 102_400, 100, 3),
    )
    .update_pg(
        PgId::new(1, 1),
        PgStat::new(PgState::ACTIVE | PgState::CLEAN, 51_200, 50, 1),
    )
    .update_pg(PgId::new(2, 0), PgStat::new(PgState::CREATING, 0, 0, 0));
    map.apply_incremental(&inc.with_pg_scan(3)).unwrap();

    map
}

/// Envelope header followed by `content`
fn envelope(struct_v: u8, compat: u8, content: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(struct_v);
    buf.put_u8(compat);
    buf.put_u32_le(content.len() as u32);
    buf.put_slice(content);
    buf.to_vec()
}

fn pg_id(buf: &mut BytesMut, pool: u64, seed: u32) {
    buf.put_u8(1);
    buf.put_u64_le(pool);
    buf.put_u32_le(seed);
    buf.put_i32_le(-1);
}

fn pg_stat(buf: &mut BytesMut, state: u32) {
    buf.put_slice(&envelope(1, 1, &{
        let mut c = BytesMut::new();
        c.put_u32_le(state);
        c.put_i64_le(0);
        c.put_i64_le(0);
        c.put_i64_le(0);
        c.to_vec()
    }));
}

#[test]
fn test_every_truncation_is_rejected() {
    let bytes = sample_map().encode_snapshot().unwrap();
    for cut in 0..bytes.len() {
        assert!(
            matches!(
                PgMap::decode_snapshot(&bytes[..cut]),
                Err(PgMapError::Decode(_))
            ),
            "prefix of {} bytes decoded",
            cut
        );
    }
}

#[test]
fn test_hand_built_snapshot() {
    let mut content = BytesMut::new();
    content.put_u64_le(5);
    content.put_u32_le(2);
    pg_id(&mut content, 1, 0);
    pg_stat(&mut content, PgState::CREATING.bits());
    pg_id(&mut content, 1, 1);
    pg_stat(&mut content, (PgState::ACTIVE | PgState::CLEAN).bits());
    content.put_u32_le(0);
    content.put_u32_le(9);
    content.put_u32_le(0);

    let map = PgMap::decode_snapshot(&envelope(1, 1, &content)).unwrap();
    assert_eq!(map.version(), 5);
    assert_eq!(map.num_pg(), 2);
    assert_eq!(map.num_osd(), 0);
    assert_eq!(map.last_osdmap_epoch(), 9);
    assert_eq!(map.last_pg_scan(), 0);
    assert_eq!(map.creating_pgs().len(), 1);
    assert!(map.store().has_seen(&PgId::new(1, 1)));
}

#[test]
fn test_duplicate_pg_rejected() {
    let mut content = BytesMut::new();
    content.put_u64_le(1);
    content.put_u32_le(2);
    pg_id(&mut content, 1, 0);
    pg_stat(&mut content, 0);
    pg_id(&mut content, 1, 0);
    pg_stat(&mut content, 0);
    content.put_u32_le(0);
    content.put_u32_le(0);
    content.put_u32_le(0);

    assert_eq!(
        PgMap::decode_snapshot(&envelope(1, 1, &content)).unwrap_err(),
        PgMapError::Decode(DencError::DuplicateKey("map"))
    );
}

#[test]
fn test_oversized_count_rejected() {
    let mut content = BytesMut::new();
    content.put_u64_le(1);
    content.put_u32_le(u32::MAX);

    assert!(matches!(
        PgMap::decode_snapshot(&envelope(1, 1, &content)),
        Err(PgMapError::Decode(DencError::Truncated { what: "map", .. }))
    ));
}

#[test]
fn test_newer_compat_rejected() {
    let content = [0u8; 24];
    assert_eq!(
        PgMap::decode_snapshot(&envelope(3, 2, &content)).unwrap_err(),
        PgMapError::Decode(DencError::UnsupportedVersion {
            what: "PgMap",
            version: 3,
            compat: 2,
            supported: 1
        })
    );
}

#[test]
fn test_newer_encoder_tail_skipped() {
    let mut content = BytesMut::from(&[0u8; 24][..]);
    content.put_u64_le(0xfeed);

    let map = PgMap::decode_snapshot(&envelope(2, 1, &content)).unwrap();
    assert_eq!(map.version(), 0);
    assert_eq!(map.num_pg(), 0);
}

#[test]
fn test_bad_pg_id_version_rejected() {
    let mut content = BytesMut::new();
    content.put_u64_le(1);
    content.put_u32_le(1);
    content.put_u8(2);
    content.put_u64_le(1);
    content.put_u32_le(0);
    content.put_i32_le(-1);

    assert!(matches!(
        PgMap::decode_snapshot(&envelope(1, 1, &content)),
        Err(PgMapError::Decode(DencError::UnsupportedVersion { what: "PgId", .. }))
    ));
}

#[test]
fn test_summary_json() {
    let summary = sample_map().summary();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["version"], 2);
    assert_eq!(json["last_osdmap_epoch"], 4);
    assert_eq!(json["last_pg_scan"], 3);
    assert_eq!(json["num_pg"], 3);
    assert_eq!(json["num_pg_by_state"]["active+clean"], 2);
    assert_eq!(json["num_pg_by_state"]["creating"], 1);
    assert_eq!(json["num_pg_creating"], 1);
    assert_eq!(json["total_pg_num_kb"], 150);
    assert_eq!(json["num_osd"], 2);
    assert_eq!(json["total_kb"], 2000);
    assert_eq!(json["total_used_kb"], 40);
    assert_eq!(json["total_avail_kb"], 1960);

    assert_eq!(
        summary.to_string(),
        "v2: 3 pgs: 2 active+clean, 1 creating; 150 KB data, 40 KB used, 1960 / 2000 KB avail"
    );
}
