//! Scenario suites against every compiled-in engine
//!
//! LevelDB runs by default; `--features rocksdb` adds RocksDB to every suite.

#[path = "../common/mod.rs"]
mod common;

mod baseline;
mod calibration;
mod sweep;
mod table;
mod wal;
