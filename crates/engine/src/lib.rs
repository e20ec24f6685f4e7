//! Storage engine adapters for fracture
//!
//! The harness core never calls an engine's native API. It talks to the
//! five-operation capability defined here:
//! - `StorageEngine::open` recovers a directory and yields a handle
//! - `EngineHandle` offers put, get, compact and close
//!
//! One adapter exists per engine family, selected at build time through cargo
//! features and at run time through [`EngineFamily`]:
//! - `leveldb` (default): pure-Rust LevelDB
//! - `rocksdb`: RocksDB through its C++ library

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod family;
pub mod options;
pub mod traits;

#[cfg(feature = "leveldb")]
pub mod leveldb;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use family::{engine_for, EngineFamily};
pub use options::OpenOptions;
pub use traits::{EngineHandle, EngineResult, StorageEngine};

#[cfg(feature = "leveldb")]
pub use leveldb::LevelDbEngine;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksDbEngine;
