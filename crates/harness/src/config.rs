//! Harness configuration via `fracture.toml`
//!
//! Every knob a scenario reads lives here: keyspace sizes, the seed of the
//! per-scenario random source, the external timeout, the engine family and
//! its open options, and the documented magic offsets. Missing fields take
//! their defaults, so an empty file is a valid configuration.

use fracture_core::{ArtifactClass, FailureClass, Keyspace};
use fracture_engine::{EngineFamily, OpenOptions};
use fracture_storage::{EmpiricalOffset, RegionKind};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "fracture.toml";

/// Default number of keys written before corruption
pub const DEFAULT_KEY_COUNT: u64 = 1000;

/// Default number of keys written after corruption
pub const DEFAULT_EXTRA_KEY_COUNT: u64 = 1000;

/// Default seed of the per-scenario random source
pub const DEFAULT_SEED: u64 = 0x5eed_f4ac_7a2e;

/// Default external timeout per scenario
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 120_000;

/// Harness configuration loaded from `fracture.toml`
///
/// # Example
///
/// ```toml
/// key_count = 1000
/// extra_key_count = 1000
/// seed = 104376105204270
/// scenario_timeout_ms = 120000
/// engine = "leveldb"
///
/// [open]
/// paranoid_checks = true
///
/// [[empirical_offsets]]
/// class = "wal-segment"
/// offset = 14984
/// expected_region = "wal_record_header"
/// assumptions = "rusty-leveldb 3.0.3, 1000 puts: length field of the record for key-400"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Keys `[0, key_count)` written before corruption
    #[serde(default = "default_key_count")]
    pub key_count: u64,
    /// Keys `[key_count, key_count + extra_key_count)` written after corruption
    #[serde(default = "default_extra_key_count")]
    pub extra_key_count: u64,
    /// Seed of the per-scenario random source
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// External timeout per scenario in milliseconds; 0 disables it
    #[serde(default = "default_scenario_timeout_ms")]
    pub scenario_timeout_ms: u64,
    /// Engine family under test
    #[serde(default)]
    pub engine: EngineFamily,
    /// Options used for every open
    #[serde(default)]
    pub open: OpenOptions,
    /// Documented magic offsets, used as structural fallbacks and for calibration
    #[serde(default = "default_empirical_offsets")]
    pub empirical_offsets: Vec<EmpiricalOffset>,
}

fn default_key_count() -> u64 {
    DEFAULT_KEY_COUNT
}

fn default_extra_key_count() -> u64 {
    DEFAULT_EXTRA_KEY_COUNT
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_scenario_timeout_ms() -> u64 {
    DEFAULT_SCENARIO_TIMEOUT_MS
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            key_count: DEFAULT_KEY_COUNT,
            extra_key_count: DEFAULT_EXTRA_KEY_COUNT,
            seed: DEFAULT_SEED,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            engine: EngineFamily::default(),
            open: OpenOptions::default(),
            empirical_offsets: default_empirical_offsets(),
        }
    }
}

impl HarnessConfig {
    /// Small keyspaces and a short timeout, for unit tests
    pub fn for_testing() -> Self {
        HarnessConfig {
            key_count: 200,
            extra_key_count: 100,
            scenario_timeout_ms: 30_000,
            ..Default::default()
        }
    }

    /// Set the number of keys written before corruption
    pub fn with_key_count(mut self, count: u64) -> Self {
        self.key_count = count;
        self
    }

    /// Set the number of keys written after corruption
    pub fn with_extra_key_count(mut self, count: u64) -> Self {
        self.extra_key_count = count;
        self
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the external timeout; `None` disables it
    pub fn with_scenario_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scenario_timeout_ms = timeout.map_or(0, |t| t.as_millis().max(1) as u64);
        self
    }

    /// Set the engine family
    pub fn with_engine(mut self, engine: EngineFamily) -> Self {
        self.engine = engine;
        self
    }

    /// Set the open options
    pub fn with_open_options(mut self, open: OpenOptions) -> Self {
        self.open = open;
        self
    }

    /// Add a documented magic offset
    pub fn with_empirical_offset(mut self, offset: EmpiricalOffset) -> Self {
        self.empirical_offsets.push(offset);
        self
    }

    /// Keyspace written before corruption
    pub fn keyspace(&self) -> Keyspace {
        Keyspace::first(self.key_count)
    }

    /// External timeout, if enabled
    pub fn scenario_timeout(&self) -> Option<Duration> {
        (self.scenario_timeout_ms > 0).then(|| Duration::from_millis(self.scenario_timeout_ms))
    }

    /// First documented offset for an artifact class
    pub fn empirical_offset(&self, class: ArtifactClass) -> Option<&EmpiricalOffset> {
        self.empirical_offsets.iter().find(|e| e.class == class)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_count == 0 {
            return Err(ConfigError::Invalid("key_count must be at least 1".into()));
        }
        if self.key_count.checked_add(self.extra_key_count).is_none() {
            return Err(ConfigError::Invalid(
                "key_count + extra_key_count overflows".into(),
            ));
        }
        if !self.engine.is_available() {
            return Err(ConfigError::EngineUnavailable(self.engine));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# fracture harness configuration
#
# Keys key-0 .. key-<key_count - 1> are written before corruption, and
# extra_key_count more after it.
key_count = 1000
extra_key_count = 1000

# Seed of the per-scenario random source (random offsets, sweeps)
seed = 104376105204270

# External timeout per scenario in milliseconds (0 disables it)
scenario_timeout_ms = 120000

# Engine under test: "leveldb" or "rocksdb" (needs the rocksdb feature)
engine = "leveldb"

[open]
create_if_missing = true
paranoid_checks = false
sync_writes = true
disable_auto_compactions = true

# Magic offsets, kept only as fallbacks for structural targeting and as
# calibration checks. Each is valid only under its stated assumptions.
[[empirical_offsets]]
class = "wal-segment"
offset = 14984
expected_region = "wal_record_header"
expected_failure = "fail_closed"
assumptions = "rusty-leveldb 3.0.3, 1000 puts of key-<i>/value-<i> into a fresh directory, one record per put: length field of the record for key-400"

[[empirical_offsets]]
class = "sorted-table"
offset = 4107
expected_region = "table_block_trailer"
expected_failure = "fail_closed"
assumptions = "rusty-leveldb 3.0.3, 1000 keys compacted into one table, 4 KiB blocks, no compression: compression byte of data block 0"
"#
    }

    /// Read and parse config from a file path, then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HarnessConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse {
        /// Config path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Config could not be serialized
    #[error("failed to serialize config: {0}")]
    Serialize(String),

    /// Config file could not be written
    #[error("failed to write config file '{}': {source}", path.display())]
    Write {
        /// Config path
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Selected engine family is not compiled in
    #[error("engine family '{0}' is not available in this build")]
    EngineUnavailable(EngineFamily),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for fracture_core::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::EngineUnavailable(family) => {
                fracture_core::Error::EngineUnavailable(family.name().to_string())
            }
            other => fracture_core::Error::Config(other.to_string()),
        }
    }
}

/// Empirical offsets for the default write pattern against rusty-leveldb
///
/// Records for keys 100..=999 are 38 bytes each after seven header bytes, so
/// the record for key-400 starts at 14980 and its length field at 14984. The
/// first data block of the compacted table holds 4107 bytes of entries, so
/// its trailer starts with the compression byte at 4107. Other engines or
/// write patterns need their own offsets; calibration reports the drift.
pub fn default_empirical_offsets() -> Vec<EmpiricalOffset> {
    vec![
        EmpiricalOffset::new(
            ArtifactClass::WalSegment,
            14984,
            RegionKind::WalRecordHeader,
            concat!(
                "rusty-leveldb 3.0.3, 1000 puts of key-<i>/value-<i> into a fresh directory, ",
                "one record per put: length field of the record for key-400",
            ),
        )
        .with_expected_failure(FailureClass::FailClosed),
        EmpiricalOffset::new(
            ArtifactClass::SortedTable,
            4107,
            RegionKind::TableBlockTrailer,
            concat!(
                "rusty-leveldb 3.0.3, 1000 keys compacted into one table, 4 KiB blocks, ",
                "no compression: compression byte of data block 0",
            ),
        )
        .with_expected_failure(FailureClass::FailClosed),
    ]
}
