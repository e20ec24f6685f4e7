//! On-disk artifacts produced by an LSM engine
//!
//! An artifact is a file the harness observes and mutates between an engine
//! close and the next open. It never owns the file's lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Class of artifact, identified by file-extension convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactClass {
    /// Write-ahead log segment (`NNNNNN.log`)
    WalSegment,
    /// Immutable sorted-table file (`NNNNNN.sst`, or `NNNNNN.ldb` for LevelDB)
    SortedTable,
}

impl ArtifactClass {
    /// File extensions recognised for this class, without the leading dot
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ArtifactClass::WalSegment => &["log"],
            ArtifactClass::SortedTable => &["sst", "ldb"],
        }
    }

    /// Whether a path carries one of this class's extensions
    ///
    /// The match is case-sensitive: engines write lowercase extensions, while
    /// the informational `LOG` file has none.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Stable name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactClass::WalSegment => "wal-segment",
            ArtifactClass::SortedTable => "sorted-table",
        }
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A located artifact: a path plus its class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Absolute or directory-relative path of the file
    pub path: PathBuf,
    /// Class the file was located as
    pub class: ArtifactClass,
}

impl Artifact {
    /// Create an artifact descriptor
    pub fn new(path: impl Into<PathBuf>, class: ArtifactClass) -> Self {
        Artifact {
            path: path.into(),
            class,
        }
    }

    /// File name component, for logging
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
