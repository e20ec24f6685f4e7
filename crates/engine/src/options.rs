//! Engine open options
//!
//! A family-neutral subset of the knobs both engines expose. Adapters map
//! each field onto their native options and ignore the ones their engine does
//! not have.

use serde::{Deserialize, Serialize};

/// Options applied when opening a storage directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Create the directory's database if it does not exist
    pub create_if_missing: bool,
    /// Ask the engine to verify checksums aggressively during recovery and reads
    pub paranoid_checks: bool,
    /// Sync the log on every put
    pub sync_writes: bool,
    /// Disable background compactions (RocksDB only)
    pub disable_auto_compactions: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            create_if_missing: true,
            paranoid_checks: false,
            sync_writes: true,
            disable_auto_compactions: true,
        }
    }
}

impl OpenOptions {
    /// Set `paranoid_checks`
    pub fn with_paranoid_checks(mut self, enabled: bool) -> Self {
        self.paranoid_checks = enabled;
        self
    }

    /// Set `sync_writes`
    pub fn with_sync_writes(mut self, enabled: bool) -> Self {
        self.sync_writes = enabled;
        self
    }

    /// Set `create_if_missing`
    pub fn with_create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    /// Set `disable_auto_compactions`
    pub fn with_auto_compactions_disabled(mut self, disabled: bool) -> Self {
        self.disable_auto_compactions = disabled;
        self
    }
}
