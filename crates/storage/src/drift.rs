//! Static drift check for empirical offsets
//!
//! Magic corruption offsets encode one engine version's layout for one write
//! pattern. Each configured constant records the region it was observed to
//! land in; this module re-parses a freshly produced artifact and reports
//! whether the constant still lands there.

use crate::resolve::{classify_offset, RegionKind};
use fracture_core::{Artifact, ArtifactClass, Error, FailureClass, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, warn};

/// A documented magic offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmpiricalOffset {
    /// Artifact class the offset applies to
    pub class: ArtifactClass,
    /// Byte offset
    pub offset: u64,
    /// Region the offset was observed to land in
    pub expected_region: RegionKind,
    /// Engine version, key/value sizes and write pattern that make it valid
    #[serde(default)]
    pub assumptions: String,
    /// Outcome a corruption at this offset was observed to produce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_failure: Option<FailureClass>,
}

impl EmpiricalOffset {
    /// Create an empirical offset
    pub fn new(
        class: ArtifactClass,
        offset: u64,
        expected_region: RegionKind,
        assumptions: impl Into<String>,
    ) -> Self {
        EmpiricalOffset {
            class,
            offset,
            expected_region,
            assumptions: assumptions.into(),
            expected_failure: None,
        }
    }

    /// Set the observed failure class
    pub fn with_expected_failure(mut self, class: FailureClass) -> Self {
        self.expected_failure = Some(class);
        self
    }
}

/// Outcome of a static drift check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "drift", rename_all = "snake_case")]
pub enum OffsetDrift {
    /// The offset still lands in the documented region
    Stable {
        /// Region observed
        region: RegionKind,
    },
    /// The offset now lands somewhere else
    Drifted {
        /// Documented region
        expected: RegionKind,
        /// Region observed
        observed: RegionKind,
    },
    /// The offset is past the end of the artifact
    OutOfRange {
        /// Artifact length
        len: u64,
    },
    /// The artifact layout could not be parsed
    Unparseable {
        /// Parser error
        reason: String,
    },
}

impl OffsetDrift {
    /// Whether the constant is still trustworthy
    pub fn is_stable(&self) -> bool {
        matches!(self, OffsetDrift::Stable { .. })
    }
}

/// Compare `empirical` against the layout of `artifact`
///
/// Only filesystem failures are errors; every layout outcome is a drift
/// verdict.
pub fn check_empirical_offset(
    artifact: &Artifact,
    empirical: &EmpiricalOffset,
) -> Result<OffsetDrift> {
    let data = fs::read(&artifact.path).map_err(|e| Error::filesystem(&artifact.path, e))?;
    let len = data.len() as u64;

    let drift = if empirical.offset >= len {
        OffsetDrift::OutOfRange { len }
    } else {
        match classify_offset(&data, empirical.class, empirical.offset) {
            Ok(region) if region.kind() == empirical.expected_region => OffsetDrift::Stable {
                region: region.kind(),
            },
            Ok(region) => OffsetDrift::Drifted {
                expected: empirical.expected_region,
                observed: region.kind(),
            },
            Err(e) => OffsetDrift::Unparseable {
                reason: e.to_string(),
            },
        }
    };

    if drift.is_stable() {
        debug!(
            target: "fracture::calibrate",
            offset = empirical.offset,
            class = %empirical.class,
            "Empirical offset stable"
        );
    } else {
        warn!(
            target: "fracture::calibrate",
            offset = empirical.offset,
            class = %empirical.class,
            path = %artifact.path.display(),
            ?drift,
            assumptions = %empirical.assumptions,
            "Empirical offset drifted"
        );
    }
    Ok(drift)
}
