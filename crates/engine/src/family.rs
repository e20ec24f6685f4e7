//! Engine family selection
//!
//! Scenario code is written once; the family picks the adapter at run time,
//! among those compiled in.

use crate::traits::StorageEngine;
use fracture_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported LSM engine families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineFamily {
    /// LevelDB (`rusty-leveldb`)
    LevelDb,
    /// RocksDB (`rocksdb`)
    RocksDb,
}

impl EngineFamily {
    /// Lowercase name used in configuration and reports
    pub fn name(&self) -> &'static str {
        match self {
            EngineFamily::LevelDb => "leveldb",
            EngineFamily::RocksDb => "rocksdb",
        }
    }

    /// Whether the adapter for this family was compiled in
    pub fn is_available(&self) -> bool {
        match self {
            EngineFamily::LevelDb => cfg!(feature = "leveldb"),
            EngineFamily::RocksDb => cfg!(feature = "rocksdb"),
        }
    }

    /// Families compiled into this build
    pub fn available() -> Vec<EngineFamily> {
        [EngineFamily::LevelDb, EngineFamily::RocksDb]
            .into_iter()
            .filter(EngineFamily::is_available)
            .collect()
    }
}

impl Default for EngineFamily {
    fn default() -> Self {
        EngineFamily::LevelDb
    }
}

impl fmt::Display for EngineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "leveldb" => Ok(EngineFamily::LevelDb),
            "rocksdb" => Ok(EngineFamily::RocksDb),
            other => Err(Error::Config(format!("unknown engine family '{other}'"))),
        }
    }
}

/// Adapter for `family`
///
/// # Errors
///
/// `EngineUnavailable` if the family's cargo feature is disabled.
pub fn engine_for(family: EngineFamily) -> Result<Arc<dyn StorageEngine>> {
    match family {
        #[cfg(feature = "leveldb")]
        EngineFamily::LevelDb => Ok(Arc::new(crate::leveldb::LevelDbEngine)),
        #[cfg(feature = "rocksdb")]
        EngineFamily::RocksDb => Ok(Arc::new(crate::rocks::RocksDbEngine)),
        #[allow(unreachable_patterns)]
        other => Err(Error::EngineUnavailable(other.name().to_string())),
    }
}
