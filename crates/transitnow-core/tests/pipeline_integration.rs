//! Integration tests for the build → publish → emit pipeline.
//!
//! Exercises catalog parsing, constellation lookup, scheduling, atomic
//! publication and the per-minute consumer against a temporary data
//! directory.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use transitnow_core::transport::OutboxTransport;
use transitnow_core::{
    publish, upcoming, ArtifactStore, BoundaryTable, Catalog, Consumer, MinuteKey, Pacer,
    ScheduleBuilder, Stamp, MAX_ANNOUNCEMENT_CHARS,
};

const CATALOG: &str = "\
NAME,TRANSIT,TT,PER,RA_STRING,DEC_STRING,R,DIST,TEFF,A
HAT-P-7 b,1,2460432.25,2.2047354,19:28:59.35,+47:58:10.2,1.431,320,6350,0.0379
Kepler-10 b,1,2460431.75,0.837495,19:02:43.06,+50:14:28.7,0.1313,173,5627,0.01684
51 Peg b,0,2460431.9,4.230785,22:57:27.98,+20:46:07.8,,15.6,5787,0.052
broken row,1
";

const BOUNDARIES: &str = "  0.0000 24.0000 -90.0000 CYG\n";

/// Pacer for tests: time never advances and sleeping returns at once.
struct FrozenPacer;

impl Pacer for FrozenPacer {
    fn elapsed(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep(&mut self, _duration: Duration) {}
}

fn build_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn build_into(store: &ArtifactStore, seed: u64) -> transitnow_core::BuildOutcome {
    let catalog = Catalog::parse(CATALOG).unwrap();
    let table = BoundaryTable::parse(BOUNDARIES).unwrap();
    let mut rng = Mcg128Xsl64::seed_from_u64(seed);
    let outcome = ScheduleBuilder::default()
        .build(&catalog, build_time(), &table, &mut rng)
        .unwrap();
    publish(&outcome, store).unwrap();
    outcome
}

#[test]
fn test_full_pipeline_build_publish_emit() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();

    let outcome = build_into(&store, 7);
    assert_eq!(outcome.planets, 2);
    assert_eq!(outcome.audit.len(), 3);
    assert!(outcome.failures.is_empty());
    assert!(outcome
        .audit
        .iter()
        .all(|m| m.char_len() <= MAX_ANNOUNCEMENT_CHARS && m.as_str().contains("in Cygnus")));

    let schedule = store.load_schedule().unwrap().unwrap();
    let keys: Vec<_> = schedule.iter().map(|(k, _)| k.as_str().to_string()).collect();
    assert_eq!(
        keys,
        vec!["2024-05-01 06:00", "2024-05-01 18:00", "2024-05-02 02:05"]
    );
    assert_eq!(
        std::fs::read_to_string(store.audit_path()).unwrap().lines().count(),
        3
    );

    let emit_time = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 20).unwrap();
    let outbox_path = dir.path().join("outbox.jsonl");
    let mut outbox = OutboxTransport::new(&outbox_path);
    let report = Consumer::default()
        .run(&store, emit_time, &mut outbox, &mut FrozenPacer)
        .unwrap();

    assert_eq!(report.minute, MinuteKey::from_datetime(emit_time));
    assert_eq!(report.posted, 1);
    let records = OutboxTransport::read_all(&outbox_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].text.starts_with("HAT-P-7 b is transiting now"));
    assert_eq!(store.read_stamp(Stamp::Posted), Some(emit_time));
    assert_eq!(store.read_stamp(Stamp::Checked), Some(emit_time));
}

#[test]
fn test_rebuild_with_fixed_seed_is_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = ArtifactStore::open(first.path()).unwrap();
    let b = ArtifactStore::open(second.path()).unwrap();

    build_into(&a, 42);
    build_into(&b, 42);

    assert_eq!(
        std::fs::read(a.schedule_path()).unwrap(),
        std::fs::read(b.schedule_path()).unwrap()
    );
    assert_eq!(
        std::fs::read(a.audit_path()).unwrap(),
        std::fs::read(b.audit_path()).unwrap()
    );
}

#[test]
fn test_rebuild_replaces_schedule_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    build_into(&store, 1);
    build_into(&store, 2);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_corrupt_schedule_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    std::fs::write(store.schedule_path(), "{\"entries\": 12").unwrap();

    let outbox_path = dir.path().join("outbox.jsonl");
    let mut outbox = OutboxTransport::new(&outbox_path);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
    let report = Consumer::default()
        .run(&store, now, &mut outbox, &mut FrozenPacer)
        .unwrap();

    assert_eq!(report.due, 0);
    assert!(OutboxTransport::read_all(&outbox_path).unwrap().is_empty());
    assert_eq!(store.read_stamp(Stamp::Checked), Some(now));
    assert!(store.read_stamp(Stamp::Posted).is_none());
}

#[test]
fn test_upcoming_reads_published_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::open(dir.path()).unwrap();
    build_into(&store, 3);
    let schedule = store.load_schedule().unwrap().unwrap();

    let at = Utc.with_ymd_and_hms(2024, 5, 2, 1, 55, 0).unwrap();
    let soon = upcoming(&schedule, at, 15);
    assert_eq!(soon.len(), 1);
    assert_eq!(soon[0].minute.as_str(), "2024-05-02 02:05");
    assert!(soon[0].text.starts_with("Kepler-10 b"));
}
