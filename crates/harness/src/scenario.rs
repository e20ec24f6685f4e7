//! Scenario definitions
//!
//! A scenario is a named corruption plus the set of optional phases to run
//! around it. Populate, corrupt and the primary verify always run.

use fracture_core::{
    ArtifactClass, CorruptionOperator, CorruptionSpec, OffsetPolicy, StructuralTarget,
};
use serde::{Deserialize, Serialize};

/// One end-to-end corruption scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Name used in logs and reports
    pub name: String,
    /// Corruption applied after population
    pub corruption: CorruptionSpec,
    /// Reopen and verify before corrupting
    #[serde(default)]
    pub baseline: bool,
    /// Reopen a second time after the primary verify and compare aggregates
    #[serde(default)]
    pub idempotence_recheck: bool,
    /// Write the extra keyspace after corruption
    #[serde(default)]
    pub write_more: bool,
    /// Verify original plus extra keys
    #[serde(default)]
    pub verify_extended: bool,
    /// Compact the original key range and verify again
    #[serde(default)]
    pub compact: bool,
    /// Rounds of repeated random corruption after everything else
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_sweep: Option<u32>,
}

impl Scenario {
    /// Scenario with only the mandatory phases
    pub fn new(name: impl Into<String>, corruption: CorruptionSpec) -> Self {
        Scenario {
            name: name.into(),
            corruption,
            baseline: false,
            idempotence_recheck: false,
            write_more: false,
            verify_extended: false,
            compact: false,
            random_sweep: None,
        }
    }

    /// Overwrite the checksum of the given physical WAL record
    ///
    /// No baseline: some engines flush the log into a table on reopen, and
    /// the log to corrupt would be gone.
    pub fn wal_header_truncation(record: usize) -> Self {
        Scenario::new(
            "wal-header-truncation",
            CorruptionSpec::structural(StructuralTarget::WalRecordHeader { record }),
        )
        .with_idempotence_recheck(true)
    }

    /// Overwrite the checksum trailer of the given table data block, then
    /// write more, verify, compact and verify again
    pub fn table_checksum(block: usize) -> Self {
        Scenario::new(
            "table-checksum",
            CorruptionSpec::structural(StructuralTarget::TableBlockChecksum { block }),
        )
        .with_baseline(true)
        .with_idempotence_recheck(true)
        .with_write_more(true)
        .with_verify_extended(true)
        .with_compact(true)
    }

    /// Corrupt a random table byte once, then `rounds` more times, verifying
    /// after each
    pub fn random_sweep(rounds: u32) -> Self {
        let mut scenario = Scenario::new(
            "random-sweep",
            CorruptionSpec::random(ArtifactClass::SortedTable),
        )
        .with_baseline(true);
        scenario.random_sweep = Some(rounds);
        scenario
    }

    /// Rename
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Toggle the baseline verify
    pub fn with_baseline(mut self, enabled: bool) -> Self {
        self.baseline = enabled;
        self
    }

    /// Toggle the idempotence recheck
    pub fn with_idempotence_recheck(mut self, enabled: bool) -> Self {
        self.idempotence_recheck = enabled;
        self
    }

    /// Toggle writing the extra keyspace
    pub fn with_write_more(mut self, enabled: bool) -> Self {
        self.write_more = enabled;
        self
    }

    /// Toggle verifying original plus extra keys
    pub fn with_verify_extended(mut self, enabled: bool) -> Self {
        self.verify_extended = enabled;
        self
    }

    /// Toggle compaction and the verify after it
    pub fn with_compact(mut self, enabled: bool) -> Self {
        self.compact = enabled;
        self
    }

    /// Replace the corruption operator
    pub fn with_operator(mut self, operator: CorruptionOperator) -> Self {
        self.corruption = self.corruption.with_operator(operator);
        self
    }

    /// Replace the corruption spec
    pub fn with_corruption(mut self, corruption: CorruptionSpec) -> Self {
        self.corruption = corruption;
        self
    }

    /// Artifact class the scenario corrupts
    pub fn class(&self) -> ArtifactClass {
        self.corruption.class
    }

    /// Whether the corruption offset comes from a parsed layout
    pub fn is_structural(&self) -> bool {
        matches!(self.corruption.offset, OffsetPolicy::Structural { .. })
    }
}
