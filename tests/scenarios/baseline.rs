//! Baseline correctness and adapter idempotence without any corruption

use crate::common::*;
use fracture::{verify_directory, Keyspace, OpenOptions};
use tempfile::TempDir;

#[test]
fn test_uncorrupted_reopen_is_intact() {
    for (family, engine) in engines() {
        let dir = TempDir::new().unwrap();
        let keyspace = Keyspace::first(1000);
        populate(engine.as_ref(), dir.path(), keyspace);

        let result =
            verify_directory(engine.as_ref(), dir.path(), &OpenOptions::default(), keyspace)
                .unwrap();
        let summary = result.summary();
        assert_eq!(summary.mismatches, 0, "{family}");
        assert_eq!(summary.read_errors, 0, "{family}");
        assert_eq!(summary.matched, 1000, "{family}");
    }
}

#[test]
fn test_reopen_twice_gives_identical_results() {
    for (family, engine) in engines() {
        let dir = TempDir::new().unwrap();
        let keyspace = Keyspace::first(300);
        populate(engine.as_ref(), dir.path(), keyspace);

        let options = OpenOptions::default();
        let first = verify_directory(engine.as_ref(), dir.path(), &options, keyspace).unwrap();
        let second = verify_directory(engine.as_ref(), dir.path(), &options, keyspace).unwrap();
        assert_eq!(first.summary(), second.summary(), "{family}");
        assert!(second.is_intact(), "{family}");
    }
}

#[test]
fn test_compaction_without_corruption_keeps_everything() {
    for (family, engine) in engines() {
        let dir = TempDir::new().unwrap();
        let keyspace = Keyspace::first(500);
        populate(engine.as_ref(), dir.path(), keyspace);

        let (low, high) = keyspace.key_bounds().unwrap();
        let mut handle = engine.open(dir.path(), &OpenOptions::default()).unwrap();
        handle.compact(&low, &high).unwrap();
        handle.close().unwrap();

        let result =
            verify_directory(engine.as_ref(), dir.path(), &OpenOptions::default(), keyspace)
                .unwrap();
        assert!(result.is_intact(), "{family}: {:?}", result.summary());
    }
}
