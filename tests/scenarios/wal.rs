//! WAL record header corruption
//!
//! Damaging a record header makes replay stop (or skip) at that record. Keys
//! written before it must still match; nothing may come back wrong.

use crate::common::*;
use fracture::{
    locate, resolve_structural, ArtifactClass, CorruptionOperator, OffsetSource, Phase, Scenario,
    ScenarioRunner, StructuralTarget, Verdict,
};
use tempfile::TempDir;

const RECORD: usize = 400;

#[test]
fn test_wal_header_corruption_fails_closed() {
    for (family, engine) in engines() {
        let runner = ScenarioRunner::new(engine, config_for(family));
        let report = runner.run(&Scenario::wal_header_truncation(RECORD));

        assert_fail_closed(&report);
        assert_eq!(report.verdict, Verdict::Passed, "{family}: {report:?}");

        let record = report.corruption.as_ref().unwrap();
        assert_eq!(record.artifact.class, ArtifactClass::WalSegment);
        assert_eq!(record.source, OffsetSource::Structural, "{family}");
        assert!(record.changed);

        let primary = summary(&report, Phase::PrimaryVerify).unwrap();
        if !primary.unopenable {
            assert!(
                primary.matched >= RECORD as u64,
                "{family}: keys before the damaged record were lost: {primary:?}"
            );
            // replay stops at the damaged record, so the keys after it are gone
            assert!(
                primary.read_errors > 0,
                "{family}: a damaged record header lost nothing: {primary:?}"
            );
        }
    }
}

#[test]
fn test_wal_reopen_is_idempotent_after_corruption() {
    for (family, engine) in engines() {
        let runner = ScenarioRunner::new(engine, config_for(family));
        let report = runner.run(&Scenario::wal_header_truncation(10));

        assert_fail_closed(&report);
        assert_eq!(
            summary(&report, Phase::PrimaryVerify),
            summary(&report, Phase::IdempotenceRecheck),
            "{family}"
        );
    }
}

#[test]
fn test_wal_tail_truncation_fails_closed() {
    for (family, engine) in engines() {
        let scenario = Scenario::wal_header_truncation(RECORD)
            .named("wal-tail-truncation")
            .with_operator(CorruptionOperator::Truncate)
            .with_write_more(true)
            .with_verify_extended(true);
        let report = ScenarioRunner::new(engine, config_for(family)).run(&scenario);

        assert_fail_closed(&report);
        let record = report.corruption.as_ref().unwrap();
        assert_eq!(record.operator, CorruptionOperator::Truncate);
        assert!(record.offset < record.original_len);
    }
}

#[test]
fn test_structural_offset_lands_on_checksum() {
    for (family, engine) in engines() {
        let dir = TempDir::new().unwrap();
        populate(engine.as_ref(), dir.path(), fracture::Keyspace::first(50));

        let artifact = locate(dir.path(), ArtifactClass::WalSegment).unwrap();
        let data = std::fs::read(&artifact.path).unwrap();
        let offset = resolve_structural(
            &data,
            StructuralTarget::WalRecordHeader { record: 3 },
            Some(0xFF),
        )
        .unwrap();
        let region = fracture::classify_offset(&data, ArtifactClass::WalSegment, offset).unwrap();
        assert_eq!(region.kind(), fracture::RegionKind::WalRecordHeader, "{family}");
    }
}
