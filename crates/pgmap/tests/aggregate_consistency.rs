//! Randomized incremental streams: the maintained aggregates must always match
//! a full recompute over the entity state.

use pgmap::{
    OsdId, OsdStat, PgId, PgMap, PgMapConfig, PgMapError, PgMapIncremental, PgState, PgStat,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

const STATES: [PgState; 5] = [
    PgState::CREATING,
    PgState::ACTIVE,
    PgState::ACTIVE.union(PgState::CLEAN),
    PgState::CREATING.union(PgState::STRAY),
    PgState::CRASHED.union(PgState::REPLAY),
];

fn random_pg_stat(rng: &mut StdRng) -> PgStat {
    let state = if rng.gen_bool(0.1) {
        // bits the tracker has no name for
        PgState::from_bits_retain(rng.gen::<u32>() | 1 << 24)
    } else {
        STATES[rng.gen_range(0..STATES.len())]
    };
    let num_bytes = rng.gen_range(0..1 << 30);
    PgStat::new(state, num_bytes, num_bytes / 1024, rng.gen_range(0..10_000))
}

fn random_osd_stat(rng: &mut StdRng) -> OsdStat {
    let kb = rng.gen_range(1..1 << 30);
    let used = rng.gen_range(0..kb);
    OsdStat::new(kb, used, kb - used, rng.gen_range(0..100_000))
}

fn random_incremental(rng: &mut StdRng, version: u64) -> PgMapIncremental {
    let mut inc = PgMapIncremental::new(version);

    for _ in 0..rng.gen_range(0..8) {
        let pgid = PgId::new(rng.gen_range(1..4), rng.gen_range(0..32));
        inc.update_pg(pgid, random_pg_stat(rng));
    }
    for _ in 0..rng.gen_range(0..4) {
        inc.update_osd(OsdId(rng.gen_range(0..12)), random_osd_stat(rng));
    }
    for _ in 0..rng.gen_range(0..3) {
        inc.remove_osd(OsdId(rng.gen_range(0..12)));
    }

    let osdmap_epoch = if rng.gen_bool(0.3) { rng.gen_range(1..1000) } else { 0 };
    let pg_scan = if rng.gen_bool(0.2) { rng.gen_range(1..1000) } else { 0 };
    inc.with_osdmap_epoch(osdmap_epoch).with_pg_scan(pg_scan)
}

fn assert_invariants(map: &PgMap) {
    assert_eq!(&map.recompute_stats(), map.stats(), "v{}", map.version());

    let store = map.store();
    assert_eq!(map.num_pg(), store.num_pgs() as i64);
    assert_eq!(map.num_osd(), store.num_osds() as i64);

    let expected_creating: BTreeSet<PgId> = store
        .pgs()
        .filter(|(_, stat)| stat.is_creating())
        .map(|(pgid, _)| *pgid)
        .collect();
    let creating: BTreeSet<PgId> = map.creating_pgs().iter().copied().collect();
    assert_eq!(creating, expected_creating);

    for (pgid, _) in store.pgs() {
        assert!(store.has_seen(pgid), "{} not in seen set", pgid);
    }

    let by_state: i64 = map.stats().num_pg_by_state().map(|(_, n)| n).sum();
    assert_eq!(by_state, map.num_pg());
    assert!(map.stats().num_pg_by_state().all(|(_, n)| n > 0));
}

#[test]
fn test_random_streams_stay_consistent() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut map = PgMap::new();
        let mut seen = BTreeSet::new();

        for version in 1..=200 {
            let inc = random_incremental(&mut rng, version);
            let (osdmap_epoch, pg_scan) = (map.last_osdmap_epoch(), map.last_pg_scan());

            map.apply_incremental(&inc).unwrap();
            seen.extend(inc.pg_stat_updates.keys().copied());

            assert_eq!(map.version(), version);
            assert_invariants(&map);
            assert_eq!(map.store().seen_pgs(), &seen);

            let want_epoch = if inc.osdmap_epoch != 0 { inc.osdmap_epoch } else { osdmap_epoch };
            let want_scan = if inc.pg_scan != 0 { inc.pg_scan } else { pg_scan };
            assert_eq!(map.last_osdmap_epoch(), want_epoch);
            assert_eq!(map.last_pg_scan(), want_scan);

            for osd in &inc.osd_stat_rm {
                assert!(map.osd_stat(osd).is_none());
            }
        }
    }
}

#[test]
fn test_random_streams_with_verification_enabled() {
    let mut config = PgMapConfig::default();
    config.mon_pgmap_verify_aggregates = true;
    config.mon_pgmap_summary_interval = cephconfig::Count(25);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut map = PgMap::with_config(config);
    for version in 1..=100 {
        map.apply_incremental(&random_incremental(&mut rng, version))
            .unwrap();
    }
    assert_eq!(map.version(), 100);
}

#[test]
fn test_out_of_order_never_mutates() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut map = PgMap::new();
    for version in 1..=20 {
        map.apply_incremental(&random_incremental(&mut rng, version))
            .unwrap();
    }

    let store = map.store().clone();
    let stats = map.stats().clone();
    let epochs = (map.last_osdmap_epoch(), map.last_pg_scan());

    for bad in [0, 1, 20, 22, 1000, u64::MAX] {
        let inc = random_incremental(&mut rng, bad).with_osdmap_epoch(9999);
        let err = map.apply_incremental(&inc).unwrap_err();
        assert_eq!(
            err,
            PgMapError::VersionMismatch {
                current: 20,
                expected: 21,
                got: bad
            }
        );
    }

    assert_eq!(map.version(), 20);
    assert_eq!(map.store(), &store);
    assert_eq!(map.stats(), &stats);
    assert_eq!((map.last_osdmap_epoch(), map.last_pg_scan()), epochs);
}

#[test]
fn test_snapshot_at_any_point_matches_live_map() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut map = PgMap::new();

    for version in 1..=60 {
        map.apply_incremental(&random_incremental(&mut rng, version))
            .unwrap();
        if version % 10 != 0 {
            continue;
        }

        let bytes = map.encode_snapshot().unwrap();
        let mut decoded = PgMap::decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded.version(), map.version());
        assert_eq!(decoded.store().pg_stats(), map.store().pg_stats());
        assert_eq!(decoded.store().osd_stats(), map.store().osd_stats());
        assert_eq!(decoded.stats(), map.stats());
        assert_invariants(&decoded);

        // both copies must evolve identically from here
        let next = random_incremental(&mut StdRng::seed_from_u64(version), version + 1);
        let mut live = map.clone();
        live.apply_incremental(&next).unwrap();
        decoded.apply_incremental(&next).unwrap();
        assert_eq!(live.stats(), decoded.stats());
        assert_eq!(
            live.encode_snapshot().unwrap(),
            decoded.encode_snapshot().unwrap()
        );
    }
}
