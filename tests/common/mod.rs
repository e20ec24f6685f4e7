//! Shared helpers for the real-engine suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use fracture::{
    engine_for, EngineFamily, HarnessConfig, Keyspace, OpenOptions, Phase, ScenarioReport,
    StorageEngine, Verdict,
};
use std::path::Path;
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

/// Install the tracing subscriber once per test binary
pub fn init_logging() {
    INIT_LOGGING.call_once(fracture::logging::init);
}

/// Every engine family compiled into this build
pub fn engines() -> Vec<(EngineFamily, Arc<dyn StorageEngine>)> {
    init_logging();
    EngineFamily::available()
        .into_iter()
        .map(|family| (family, engine_for(family).unwrap()))
        .collect()
}

/// Default harness configuration for a family: 1000 keys, then 1000 more
pub fn config_for(family: EngineFamily) -> HarnessConfig {
    HarnessConfig::default().with_engine(family)
}

/// Open, write `keyspace`, close
pub fn populate(engine: &dyn StorageEngine, dir: &Path, keyspace: Keyspace) {
    let mut handle = engine.open(dir, &OpenOptions::default()).unwrap();
    for entry in keyspace.iter() {
        handle.put(&entry.key, &entry.value).unwrap();
    }
    handle.close().unwrap();
}

/// Open, write `keyspace`, compact it into a sorted table, close
///
/// A reopen alone is not enough: an engine that reuses its log replays it
/// into a memtable and writes no table.
pub fn populate_table(engine: &dyn StorageEngine, dir: &Path, keyspace: Keyspace) {
    let mut handle = engine.open(dir, &OpenOptions::default()).unwrap();
    for entry in keyspace.iter() {
        handle.put(&entry.key, &entry.value).unwrap();
    }
    let (low, high) = keyspace.key_bounds().unwrap();
    handle.compact(&low, &high).unwrap();
    handle.close().unwrap();
}

/// The scenario never read a wrong value and never hit a harness defect
///
/// Engine errors, unopenable directories and even engine panics are outcomes
/// of the engine under test; wrong values and a broken harness are not.
pub fn assert_fail_closed(report: &ScenarioReport) {
    assert!(
        report.mismatches.is_empty(),
        "{} returned wrong values: {:?}",
        report.engine,
        report.mismatches
    );
    if let Some(failure) = &report.failure {
        let harness_kinds = [
            "integrity_mismatch",
            "artifact_not_found",
            "empty_artifact",
            "filesystem_error",
            "offset_out_of_range",
            "layout_error",
            "scenario_aborted",
        ];
        assert!(
            !harness_kinds.contains(&failure.kind.as_str()),
            "{} scenario '{}' failed: {:?}",
            report.engine,
            report.scenario,
            failure
        );
    }
    assert_ne!(report.verdict, Verdict::TimedOut, "{report:?}");
}

/// Aggregates of a verification phase that ran
pub fn summary(report: &ScenarioReport, phase: Phase) -> Option<fracture::VerificationSummary> {
    report.phase(phase).and_then(|p| p.summary)
}
