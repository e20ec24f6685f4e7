//! Core types for fracture
//!
//! This crate defines the vocabulary shared by every other crate:
//! - Keyspace: deterministic `key-<i>` / `value-<i>` pairs over an index range
//! - Artifact / ArtifactClass: on-disk files an engine leaves behind
//! - CorruptionSpec / CorruptionRecord: what to corrupt and what was corrupted
//! - VerificationResult: per-key outcomes and aggregates produced by the oracle
//! - Error / EngineError: the harness error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod corruption;
pub mod error;
pub mod keyspace;
pub mod verification;

pub use artifact::{Artifact, ArtifactClass};
pub use corruption::{
    CorruptionOperator, CorruptionRecord, CorruptionSpec, OffsetPolicy, OffsetSource,
    StructuralTarget,
};
pub use error::{EngineError, EngineOp, Error, Result};
pub use keyspace::{Keyspace, KeyspaceEntry};
pub use verification::{
    FailureClass, KeyCheck, KeyOutcome, LossPattern, Mismatch, VerificationResult,
    VerificationSummary,
};
