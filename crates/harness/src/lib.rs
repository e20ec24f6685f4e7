//! Scenario orchestration for fracture
//!
//! This crate ties the pieces together:
//! - `oracle`: classifies every key of a keyspace after an engine operation
//! - `runner`: drives a [`Scenario`] through populate, corrupt, verify,
//!   write-more, compact and sweep phases, producing a [`ScenarioReport`]
//! - `calibrate`: re-checks documented magic offsets against a live engine
//! - `config`: the `fracture.toml` configuration
//! - `testing`: a checksum-framed engine double for deterministic tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibrate;
pub mod config;
pub mod context;
pub mod logging;
pub mod oracle;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod testing;

pub use calibrate::{calibrate, calibrate_all, CalibrationReport};
pub use config::{ConfigError, HarnessConfig, CONFIG_FILE_NAME};
pub use context::ScenarioContext;
pub use oracle::{check_directory, ensure_fail_closed, verify, verify_directory, DirectoryCheck};
pub use report::{FailureDetail, Phase, PhaseReport, PhaseStatus, ScenarioReport, Verdict};
pub use runner::ScenarioRunner;
pub use scenario::Scenario;
