//! Sorted-table checksum corruption, then write-more and compaction

use crate::common::*;
use fracture::{
    locate, verify_directory, ArtifactClass, KeyOutcome, Keyspace, LossPattern, OffsetSource,
    Phase, PhaseStatus, Scenario, ScenarioContext, ScenarioRunner, TableLayout,
};

/// Table checksum scenario without the phases that rewrite the table
fn damaged_block(block: usize) -> Scenario {
    Scenario::table_checksum(block)
        .with_write_more(false)
        .with_verify_extended(false)
        .with_compact(false)
}

#[test]
fn test_table_checksum_corruption_full_lifecycle() {
    for (family, engine) in engines() {
        let runner = ScenarioRunner::new(engine, config_for(family));
        let report = runner.run(&Scenario::table_checksum(0));

        assert_fail_closed(&report);

        let record = report.corruption.as_ref().unwrap();
        assert_eq!(record.artifact.class, ArtifactClass::SortedTable);
        assert!(matches!(
            record.source,
            OffsetSource::Structural | OffsetSource::EmpiricalFallback
        ));
        assert_eq!(report.status(Phase::Baseline), PhaseStatus::Passed, "{family}");

        // A lost block is one contiguous key range, never a scatter
        let primary = report.phase(Phase::PrimaryVerify).unwrap();
        assert!(
            !matches!(primary.loss, Some(LossPattern::Scattered { .. })),
            "{family}: {:?}",
            primary.loss
        );

        // Writes after the corruption are unaffected by it
        if let Some(extended) = summary(&report, Phase::VerifyExtended) {
            if !extended.unopenable {
                assert_eq!(extended.total_checked, 2000);
                let note = report.phase(Phase::VerifyExtended).unwrap().note.clone();
                assert!(
                    !note.unwrap_or_default().contains("written after corruption"),
                    "{family}: new writes lost"
                );
            }
        }

        // Compaction may drop unreadable data but never invents values
        assert_ne!(report.status(Phase::Compact), PhaseStatus::Failed, "{family}");
        if let Some(compacted) = summary(&report, Phase::VerifyCompacted) {
            assert_eq!(compacted.mismatches, 0);
        }
    }
}

#[test]
fn test_table_corruption_in_later_block() {
    for (family, engine) in engines() {
        let runner = ScenarioRunner::new(engine, config_for(family));
        let report = runner.run(&Scenario::table_checksum(2).named("table-checksum-block-2"));
        assert_fail_closed(&report);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["scenario"], "table-checksum-block-2");
        assert_eq!(json["engine"], family.to_string());
        assert_eq!(json["artifact_class"], "sorted-table");
    }
}

#[test]
fn test_table_read_errors_stay_inside_damaged_block() {
    for (family, engine) in engines() {
        let config = config_for(family);
        let keyspace = config.keyspace();
        let runner = ScenarioRunner::new(engine.clone(), config.clone());
        let mut ctx = ScenarioContext::new(config.seed, keyspace).unwrap();
        let report = runner.run_in(&damaged_block(0), &mut ctx);
        assert_fail_closed(&report);

        let record = report.corruption.as_ref().unwrap();
        if record.source != OffsetSource::Structural {
            continue;
        }
        // only the trailer of block 0 changed, so the index still parses
        let table = locate(ctx.dir(), ArtifactClass::SortedTable).unwrap();
        let layout = TableLayout::parse(&std::fs::read(&table.path).unwrap()).unwrap();
        assert!(layout.block(0).unwrap().trailer_range().contains(&record.offset));

        let result =
            verify_directory(engine.as_ref(), ctx.dir(), &config.open, keyspace).unwrap();
        if result.is_unopenable() {
            continue;
        }
        let lost = result.read_error_indices();
        assert!(!lost.is_empty(), "{family}: a damaged block lost nothing");
        for index in keyspace.iter().map(|entry| entry.index) {
            let key = Keyspace::key(index);
            if layout.block_covers(0, &key) {
                continue;
            }
            assert_eq!(
                result.outcome(index),
                Some(&KeyOutcome::Match),
                "{family}: key-{index} lies outside the damaged block"
            );
        }
        for index in lost {
            assert!(
                layout.block_covers(0, &Keyspace::key(index)),
                "{family}: key-{index} was lost but is not in block 0"
            );
        }
    }
}

#[test]
fn test_keys_written_after_corruption_read_back_alone() {
    for (family, engine) in engines() {
        let config = config_for(family);
        let keyspace = config.keyspace();
        let extra = keyspace.following(config.extra_key_count);
        let runner = ScenarioRunner::new(engine.clone(), config.clone());
        let mut ctx = ScenarioContext::new(config.seed, keyspace).unwrap();
        let scenario = damaged_block(0).with_write_more(true);
        let report = runner.run_in(&scenario, &mut ctx);
        assert_fail_closed(&report);
        assert_eq!(report.status(Phase::WriteMore), PhaseStatus::Passed, "{family}");

        let result = verify_directory(engine.as_ref(), ctx.dir(), &config.open, extra).unwrap();
        assert!(result.is_intact(), "{family}: {:?}", result.summary());
        assert_eq!(result.summary().matched, config.extra_key_count);
    }
}
