//! Format drift self-checks against live engines

use crate::common::*;
use fracture::{
    calibrate_all, check_empirical_offset, locate, resolve_structural, ArtifactClass,
    EmpiricalOffset, EngineFamily, FailureClass, Keyspace, OffsetDrift, RegionKind,
    StructuralTarget,
};
use tempfile::TempDir;

#[test]
fn test_default_offsets_never_produce_wrong_values() {
    for (family, engine) in engines() {
        let config = config_for(family);
        let reports = calibrate_all(engine.as_ref(), &config).unwrap();
        assert_eq!(reports.len(), config.empirical_offsets.len());
        for report in reports {
            assert_ne!(
                report.observed,
                Some(FailureClass::Mismatching),
                "{family}: offset {} of {} returned wrong values",
                report.empirical.offset,
                report.empirical.class
            );
        }
    }
}

#[test]
fn test_default_offsets_hold_for_leveldb() {
    for (family, engine) in engines() {
        if family != EngineFamily::LevelDb {
            continue;
        }
        let config = config_for(family);
        for report in calibrate_all(engine.as_ref(), &config).unwrap() {
            assert!(
                matches!(report.static_drift, OffsetDrift::Stable { .. }),
                "offset {} of {}: {:?}",
                report.empirical.offset,
                report.empirical.class,
                report.static_drift
            );
            assert_eq!(report.observed, Some(FailureClass::FailClosed));
            assert!(!report.drifted);
        }
    }
}

#[test]
fn test_default_table_offset_lands_in_first_trailer() {
    for (family, engine) in engines() {
        if family != EngineFamily::LevelDb {
            continue;
        }
        let dir = TempDir::new().unwrap();
        populate_table(engine.as_ref(), dir.path(), Keyspace::first(1000));
        let artifact = locate(dir.path(), ArtifactClass::SortedTable).unwrap();
        let data = std::fs::read(&artifact.path).unwrap();
        let layout = fracture::TableLayout::parse(&data).unwrap();
        let trailer = layout.block(0).unwrap().trailer_range();
        assert_eq!(trailer.start, 4107);
    }
}

#[test]
fn test_static_drift_against_fresh_log() {
    for (family, engine) in engines() {
        let dir = TempDir::new().unwrap();
        populate(engine.as_ref(), dir.path(), Keyspace::first(100));
        let artifact = locate(dir.path(), ArtifactClass::WalSegment).unwrap();
        let data = std::fs::read(&artifact.path).unwrap();

        let header = resolve_structural(
            &data,
            StructuralTarget::WalRecordHeader { record: 20 },
            None,
        )
        .unwrap();
        let stable = EmpiricalOffset::new(
            ArtifactClass::WalSegment,
            header,
            RegionKind::WalRecordHeader,
            "100 synced puts",
        );
        assert_eq!(
            check_empirical_offset(&artifact, &stable).unwrap(),
            OffsetDrift::Stable {
                region: RegionKind::WalRecordHeader
            },
            "{family}"
        );

        // The same constant documented as a payload offset has drifted
        let stale = EmpiricalOffset::new(
            ArtifactClass::WalSegment,
            header,
            RegionKind::WalRecordPayload,
            "100 synced puts",
        );
        assert!(matches!(
            check_empirical_offset(&artifact, &stale).unwrap(),
            OffsetDrift::Drifted { .. }
        ));
    }
}
