//! Corruption specifications and records
//!
//! A [`CorruptionSpec`] says which artifact class to corrupt, how to choose the
//! offset and what to do at that offset. Applying it yields a
//! [`CorruptionRecord`] carrying the resolved offset, so that a failure can be
//! reproduced and a magic offset can be re-derived when it stops working.

use crate::artifact::{Artifact, ArtifactClass};
use serde::{Deserialize, Serialize};

/// Byte written by the default overwrite operator
pub const DEFAULT_OVERWRITE_BYTE: u8 = 0xFF;

/// How the corruption offset is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// A literal byte offset
    Fixed {
        /// Byte offset into the artifact
        offset: u64,
    },
    /// A uniformly random offset in `[0, len)`, drawn from the scenario's seeded source
    Random,
    /// An offset derived from the parsed on-disk structure
    Structural {
        /// Structure to land in
        target: StructuralTarget,
        /// Empirical constant used when the structure cannot be parsed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<u64>,
    },
}

/// Structurally significant region an offset should land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "region", rename_all = "snake_case")]
pub enum StructuralTarget {
    /// Checksum field of the n-th physical WAL record header
    WalRecordHeader {
        /// Zero-based physical record number
        record: usize,
    },
    /// Checksum trailer of the n-th data block of a sorted table
    TableBlockChecksum {
        /// Zero-based data block number
        block: usize,
    },
}

impl StructuralTarget {
    /// Artifact class the target lives in
    pub fn class(&self) -> ArtifactClass {
        match self {
            StructuralTarget::WalRecordHeader { .. } => ArtifactClass::WalSegment,
            StructuralTarget::TableBlockChecksum { .. } => ArtifactClass::SortedTable,
        }
    }
}

/// Mutation applied at the resolved offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CorruptionOperator {
    /// Replace the byte at the offset
    Overwrite {
        /// Replacement byte
        byte: u8,
    },
    /// Cut the file so the offset becomes its new length
    Truncate,
}

impl Default for CorruptionOperator {
    fn default() -> Self {
        CorruptionOperator::Overwrite {
            byte: DEFAULT_OVERWRITE_BYTE,
        }
    }
}

/// What to corrupt, where, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionSpec {
    /// Artifact class to locate and corrupt
    pub class: ArtifactClass,
    /// Offset selection policy
    pub offset: OffsetPolicy,
    /// Mutation to apply
    #[serde(default)]
    pub operator: CorruptionOperator,
}

impl CorruptionSpec {
    /// Overwrite a fixed offset with 0xFF
    pub fn fixed(class: ArtifactClass, offset: u64) -> Self {
        CorruptionSpec {
            class,
            offset: OffsetPolicy::Fixed { offset },
            operator: CorruptionOperator::default(),
        }
    }

    /// Overwrite a random offset with 0xFF
    pub fn random(class: ArtifactClass) -> Self {
        CorruptionSpec {
            class,
            offset: OffsetPolicy::Random,
            operator: CorruptionOperator::default(),
        }
    }

    /// Overwrite a structurally derived offset with 0xFF
    pub fn structural(target: StructuralTarget) -> Self {
        CorruptionSpec {
            class: target.class(),
            offset: OffsetPolicy::Structural {
                target,
                fallback: None,
            },
            operator: CorruptionOperator::default(),
        }
    }

    /// Set the empirical fallback of a structural policy; other policies are unchanged
    pub fn with_fallback(mut self, offset: u64) -> Self {
        if let OffsetPolicy::Structural { fallback, .. } = &mut self.offset {
            *fallback = Some(offset);
        }
        self
    }

    /// Set the operator
    pub fn with_operator(mut self, operator: CorruptionOperator) -> Self {
        self.operator = operator;
        self
    }
}

/// Where a resolved offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetSource {
    /// Literal offset from the spec
    Fixed,
    /// Drawn from the seeded random source
    Random,
    /// Derived from the parsed layout
    Structural,
    /// Layout parsing failed; the spec's empirical constant was used
    EmpiricalFallback,
}

/// Exact account of one applied corruption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionRecord {
    /// Corrupted file
    pub artifact: Artifact,
    /// Resolved byte offset
    pub offset: u64,
    /// How the offset was resolved
    pub source: OffsetSource,
    /// Operator applied
    pub operator: CorruptionOperator,
    /// File length before corruption
    pub original_len: u64,
    /// Byte at the offset before corruption
    pub previous: u8,
    /// Whether the file content actually changed
    pub changed: bool,
}
