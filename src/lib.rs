//! fracture - fault injection and integrity verification for embedded LSM engines
//!
//! fracture writes a deterministic keyspace through a storage engine, corrupts
//! one of the files the engine leaves behind while it is closed, and then
//! drives the engine through reopen, further writes and compaction. After
//! every step each key must either read back correctly or fail to read. A
//! wrong value is the one outcome that always fails a scenario.
//!
//! # Quick Start
//!
//! ```ignore
//! use fracture::{HarnessConfig, Scenario, ScenarioRunner};
//!
//! fracture::logging::init();
//! let runner = ScenarioRunner::from_config(HarnessConfig::default())?;
//! let report = runner.run(&Scenario::table_checksum(0));
//! println!("{}", report.to_json()?);
//! report.ensure_passed()?;
//! ```
//!
//! # Architecture
//!
//! - `fracture-core`: keyspace, artifacts, corruption specs, verification results, errors
//! - `fracture-storage`: artifact location, corruption injection, on-disk format introspection
//! - `fracture-engine`: the five-operation engine capability and its LevelDB/RocksDB adapters
//! - `fracture-harness`: oracle, scenario runner, reports, configuration, calibration

pub use fracture_core::*;
pub use fracture_engine::{
    engine_for, EngineFamily, EngineHandle, EngineResult, OpenOptions, StorageEngine,
};
pub use fracture_harness::{
    calibrate, calibrate_all, check_directory, ensure_fail_closed, verify, verify_directory,
    CalibrationReport, ConfigError, DirectoryCheck, FailureDetail, HarnessConfig, Phase,
    PhaseReport, PhaseStatus, Scenario, ScenarioContext, ScenarioReport, ScenarioRunner, Verdict,
    CONFIG_FILE_NAME,
};
pub use fracture_storage::{
    check_empirical_offset, classify_offset, corrupt, locate, locate_all, resolve_structural,
    ArtifactLocator, EmpiricalOffset, OffsetDrift, Region, RegionKind, TableLayout,
};

#[cfg(feature = "leveldb")]
pub use fracture_engine::LevelDbEngine;
#[cfg(feature = "rocksdb")]
pub use fracture_engine::RocksDbEngine;

/// Tracing setup
pub use fracture_harness::logging;
/// Test doubles
pub use fracture_harness::testing;
/// On-disk format introspection
pub use fracture_storage::format;
