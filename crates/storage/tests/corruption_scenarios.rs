//! Locate-then-corrupt scenarios on synthetic storage directories
//!
//! Covers the path a scenario takes between engine close and reopen: find
//! the artifact, resolve the offset, mutate the file, report what changed.

use fracture_core::{
    ArtifactClass, CorruptionOperator, CorruptionSpec, Error, OffsetSource, StructuralTarget,
};
use fracture_storage::{corrupt, locate, locate_all, ArtifactLocator};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, data: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

/// A directory shaped like a LevelDB database after one flush
fn engine_like_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "CURRENT", b"MANIFEST-000002\n");
    write(dir.path(), "LOCK", b"");
    write(dir.path(), "LOG", b"informational, not a log segment");
    write(dir.path(), "MANIFEST-000002", &[1; 64]);
    write(dir.path(), "000003.log", &[2; 500]);
    write(dir.path(), "000005.ldb", &[3; 900]);
    dir
}

// === Location ===

#[test]
fn locate_ignores_informational_log() {
    let dir = engine_like_dir();
    let wal = locate(dir.path(), ArtifactClass::WalSegment).unwrap();
    assert!(wal.path.ends_with("000003.log"));

    let table = ArtifactLocator::new(dir.path())
        .locate(ArtifactClass::SortedTable)
        .unwrap();
    assert!(table.path.ends_with("000005.ldb"));
}

#[test]
fn locate_first_of_many_is_stable() {
    let dir = engine_like_dir();
    write(dir.path(), "000009.sst", &[4; 10]);
    write(dir.path(), "archive/000001.sst", &[5; 10]);

    let all = locate_all(dir.path(), ArtifactClass::SortedTable).unwrap();
    assert_eq!(all.len(), 3);
    let first = locate(dir.path(), ArtifactClass::SortedTable).unwrap();
    assert_eq!(first, all[0]);
    assert_eq!(first, locate(dir.path(), ArtifactClass::SortedTable).unwrap());
}

#[test]
fn locate_reports_missing_class() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "CURRENT", b"x");
    match locate(dir.path(), ArtifactClass::WalSegment) {
        Err(Error::ArtifactNotFound { class, .. }) => assert_eq!(class, ArtifactClass::WalSegment),
        other => panic!("unexpected: {other:?}"),
    }
}

// === Injection ===

#[test]
fn wal_overwrite_then_truncate() {
    let dir = engine_like_dir();
    let wal = locate(dir.path(), ArtifactClass::WalSegment).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let record = corrupt(&wal, &CorruptionSpec::fixed(ArtifactClass::WalSegment, 100), &mut rng)
        .unwrap();
    assert_eq!(record.offset, 100);
    assert_eq!(record.previous, 2);
    assert!(record.changed);
    assert_eq!(fs::read(&wal.path).unwrap()[100], 0xFF);

    let spec = CorruptionSpec::fixed(ArtifactClass::WalSegment, 300)
        .with_operator(CorruptionOperator::Truncate);
    let record = corrupt(&wal, &spec, &mut rng).unwrap();
    assert_eq!(record.original_len, 500);
    assert_eq!(fs::metadata(&wal.path).unwrap().len(), 300);
}

#[test]
fn structural_target_on_foreign_format_uses_fallback() {
    let dir = engine_like_dir();
    let table = locate(dir.path(), ArtifactClass::SortedTable).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let target = StructuralTarget::TableBlockChecksum { block: 0 };
    match corrupt(&table, &CorruptionSpec::structural(target), &mut rng) {
        Err(Error::Layout(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(fs::read(&table.path).unwrap(), vec![3; 900]);

    let spec = CorruptionSpec::structural(target).with_fallback(640);
    let record = corrupt(&table, &spec, &mut rng).unwrap();
    assert_eq!(record.source, OffsetSource::EmpiricalFallback);
    assert_eq!(record.offset, 640);
}

#[test]
fn empty_artifact_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "000007.log", b"");
    let wal = locate(dir.path(), ArtifactClass::WalSegment).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(
        corrupt(&wal, &CorruptionSpec::random(ArtifactClass::WalSegment), &mut rng),
        Err(Error::EmptyArtifact(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_overwrite_touches_exactly_one_byte(
        data in prop::collection::vec(0u8..0xFF, 1..2048),
        seed in any::<u64>(),
    ) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "000001.sst", &data);
        let table = locate(dir.path(), ArtifactClass::SortedTable).unwrap();

        let mut rng = StdRng::seed_from_u64(seed);
        let record =
            corrupt(&table, &CorruptionSpec::random(ArtifactClass::SortedTable), &mut rng).unwrap();
        let after = fs::read(&table.path).unwrap();

        prop_assert_eq!(after.len(), data.len());
        prop_assert!(record.changed);
        prop_assert_eq!(record.previous, data[record.offset as usize]);
        let diffs: Vec<usize> = (0..data.len()).filter(|&i| after[i] != data[i]).collect();
        prop_assert_eq!(diffs, vec![record.offset as usize]);
    }

    #[test]
    fn same_seed_same_random_offset(len in 1usize..4096, seed in any::<u64>()) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/000001.log", &vec![0; len]);
        write(dir.path(), "b/000001.log", &vec![0; len]);
        let wals = locate_all(dir.path(), ArtifactClass::WalSegment).unwrap();

        let spec = CorruptionSpec::random(ArtifactClass::WalSegment);
        let first = corrupt(&wals[0], &spec, &mut StdRng::seed_from_u64(seed)).unwrap();
        let second = corrupt(&wals[1], &spec, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(first.offset, second.offset);
        prop_assert!(first.offset < len as u64);
    }

    #[test]
    fn truncation_leaves_offset_bytes(len in 1usize..2048, cut in 0usize..2048) {
        let cut = cut % len;
        let dir = TempDir::new().unwrap();
        write(dir.path(), "000002.log", &vec![7; len]);
        let wal = locate(dir.path(), ArtifactClass::WalSegment).unwrap();

        let spec = CorruptionSpec::fixed(ArtifactClass::WalSegment, cut as u64)
            .with_operator(CorruptionOperator::Truncate);
        let record = corrupt(&wal, &spec, &mut StdRng::seed_from_u64(0)).unwrap();
        prop_assert_eq!(record.original_len, len as u64);
        prop_assert_eq!(fs::metadata(&wal.path).unwrap().len(), cut as u64);
    }
}
