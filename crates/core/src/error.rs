//! Error types for fracture
//!
//! The taxonomy separates harness-level defects (missing or empty artifacts,
//! filesystem failures) from engine-reported failures and from the one
//! outcome the harness exists to catch: a key that reads back the wrong value.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::verification::Mismatch;
use crate::ArtifactClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fracture operations
pub type Result<T> = std::result::Result<T, Error>;

/// The engine operation that produced an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOp {
    /// Opening (and recovering) a storage directory
    Open,
    /// Writing a key
    Put,
    /// Reading a key
    Get,
    /// Closing the handle
    Close,
    /// Compacting a key range
    Compact,
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineOp::Open => "open",
            EngineOp::Put => "put",
            EngineOp::Get => "get",
            EngineOp::Close => "close",
            EngineOp::Compact => "compact",
        };
        f.write_str(name)
    }
}

/// Failure reported by a storage engine through its adapter
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("engine {op} failed: {message}")]
pub struct EngineError {
    /// Operation that failed
    pub op: EngineOp,
    /// Engine-provided description
    pub message: String,
}

impl EngineError {
    /// Create an engine error for the given operation
    pub fn new(op: EngineOp, message: impl Into<String>) -> Self {
        EngineError {
            op,
            message: message.into(),
        }
    }

    /// Shorthand for a failed open
    pub fn open(message: impl Into<String>) -> Self {
        Self::new(EngineOp::Open, message)
    }

    /// Shorthand for a failed put
    pub fn put(message: impl Into<String>) -> Self {
        Self::new(EngineOp::Put, message)
    }

    /// Shorthand for a failed get
    pub fn get(message: impl Into<String>) -> Self {
        Self::new(EngineOp::Get, message)
    }

    /// Shorthand for a failed close
    pub fn close(message: impl Into<String>) -> Self {
        Self::new(EngineOp::Close, message)
    }

    /// Shorthand for a failed compaction
    pub fn compact(message: impl Into<String>) -> Self {
        Self::new(EngineOp::Compact, message)
    }
}

/// Error types for the harness
#[derive(Debug, Error)]
pub enum Error {
    /// No file of the requested class exists under the directory
    #[error("{class} artifact not found under {}", dir.display())]
    ArtifactNotFound {
        /// Directory that was walked
        dir: PathBuf,
        /// Class that was looked for
        class: ArtifactClass,
    },

    /// The artifact has zero length, so no offset can be chosen
    #[error("artifact is empty: {}", .0.display())]
    EmptyArtifact(PathBuf),

    /// I/O failure unrelated to the injected corruption
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path being read, written or walked
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A fixed offset does not fit inside the artifact
    #[error("offset {offset} out of range for {} ({len} bytes)", path.display())]
    OffsetOutOfRange {
        /// Artifact path
        path: PathBuf,
        /// Requested offset
        offset: u64,
        /// Artifact length
        len: u64,
    },

    /// On-disk layout could not be parsed and no fallback offset was given
    #[error("layout error: {0}")]
    Layout(String),

    /// Engine-reported failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The oracle read back a wrong value
    #[error("integrity mismatch: {count} key(s) returned wrong values, first {first}")]
    IntegrityMismatch {
        /// Number of mismatching keys
        count: usize,
        /// First mismatch, in keyspace order
        first: Mismatch,
    },

    /// The scenario did not finish within its external timeout
    #[error("scenario '{scenario}' timed out after {elapsed:?}")]
    ScenarioTimeout {
        /// Scenario name
        scenario: String,
        /// Time waited before giving up
        elapsed: Duration,
    },

    /// The engine panicked on the scenario thread
    #[error("scenario '{scenario}' panicked: {message}")]
    EnginePanic {
        /// Scenario name
        scenario: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// A scenario stopped on a harness-level defect; carries the recorded kind
    /// when the original error is no longer available (e.g. a deserialized report)
    #[error("scenario '{scenario}' aborted ({kind}): {message}")]
    ScenarioAborted {
        /// Scenario name
        scenario: String,
        /// Kind of the original error
        kind: String,
        /// Display of the original error
        message: String,
    },

    /// The adapter for an engine family was not compiled in
    #[error("engine family '{0}' is not available in this build")]
    EngineUnavailable(String),

    /// Invalid harness configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts a scenario regardless of the phase it occurs in
    ///
    /// Harness-level defects and precondition violations are never engine
    /// behaviour signals.
    pub fn is_harness_defect(&self) -> bool {
        matches!(
            self,
            Error::ArtifactNotFound { .. }
                | Error::EmptyArtifact(_)
                | Error::Filesystem { .. }
                | Error::OffsetOutOfRange { .. }
                | Error::Layout(_)
                | Error::Config(_)
                | Error::ScenarioAborted { .. }
        )
    }

    /// Short stable name of the error kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ArtifactNotFound { .. } => "artifact_not_found",
            Error::EmptyArtifact(_) => "empty_artifact",
            Error::Filesystem { .. } => "filesystem_error",
            Error::OffsetOutOfRange { .. } => "offset_out_of_range",
            Error::Layout(_) => "layout_error",
            Error::Engine(_) => "engine_error",
            Error::IntegrityMismatch { .. } => "integrity_mismatch",
            Error::ScenarioTimeout { .. } => "scenario_timeout",
            Error::EnginePanic { .. } => "engine_panic",
            Error::ScenarioAborted { .. } => "scenario_aborted",
            Error::EngineUnavailable(_) => "engine_unavailable",
            Error::Config(_) => "config_error",
        }
    }
}
