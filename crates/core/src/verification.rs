//! Verification results
//!
//! A [`VerificationResult`] is produced fresh by every oracle pass and never
//! mutated afterwards. It keeps one outcome per key plus enough context to
//! explain the aggregate: which keys were lost, whether the loss follows write
//! order (a truncated log) or key order (a lost table block), and the full
//! detail of every wrong value.

use crate::keyspace::Keyspace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of reading one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Read back exactly the expected value
    Match,
    /// Engine reported the key as absent
    Missing,
    /// Engine returned an error for the key
    ReadError(String),
    /// Engine returned a value that differs from the expected one
    Mismatch {
        /// Bytes the engine returned
        actual: Vec<u8>,
    },
}

impl KeyOutcome {
    /// Absent or erroring: the fail-closed degradation the harness tolerates
    pub fn is_read_error(&self) -> bool {
        matches!(self, KeyOutcome::Missing | KeyOutcome::ReadError(_))
    }
}

/// Outcome for a specific keyspace index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    /// Keyspace index
    pub index: u64,
    /// What the engine returned
    pub outcome: KeyOutcome,
}

/// A silently wrong read, with full diagnostic detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Keyspace index
    pub index: u64,
    /// Key read
    pub key: Vec<u8>,
    /// Value written
    pub expected: Vec<u8>,
    /// Value returned
    pub actual: Vec<u8>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key '{}': got '{}', want '{}'",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.actual),
            String::from_utf8_lossy(&self.expected)
        )
    }
}

/// Shape of the set of read-errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum LossPattern {
    /// The engine could not be opened, so nothing was read
    Unopenable,
    /// Every key was readable
    None,
    /// Lost keys are contiguous in write order, as after a log truncation
    IndexRun {
        /// First lost index
        first: u64,
        /// Last lost index
        last: u64,
    },
    /// Lost keys are contiguous in key order, as after losing a table block
    KeyRange {
        /// Smallest lost key
        low: String,
        /// Largest lost key
        high: String,
    },
    /// No contiguous structure
    Scattered {
        /// Number of lost keys
        count: usize,
    },
}

/// Coarse outcome of a verification pass, used to pin down what a known
/// corruption is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The engine opened and every key matched
    Intact,
    /// The engine refused to open
    Unopenable,
    /// Some keys were missing or erroring, none were wrong
    FailClosed,
    /// At least one key returned a wrong value
    Mismatching,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureClass::Intact => "intact",
            FailureClass::Unopenable => "unopenable",
            FailureClass::FailClosed => "fail-closed",
            FailureClass::Mismatching => "mismatching",
        };
        f.write_str(name)
    }
}

/// Aggregate counts of a verification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Keys checked
    pub total_checked: u64,
    /// Keys that matched
    pub matched: u64,
    /// Keys that were missing or erroring
    pub read_errors: u64,
    /// Subset of `read_errors` reported as absent
    pub missing: u64,
    /// Keys that returned the wrong value
    pub mismatches: u64,
    /// The engine could not be opened
    pub unopenable: bool,
}

/// Result of verifying a keyspace against an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    keyspace: Keyspace,
    unopenable: Option<String>,
    checks: Vec<KeyCheck>,
}

impl VerificationResult {
    /// Result built from per-key checks
    pub fn from_checks(keyspace: Keyspace, checks: Vec<KeyCheck>) -> Self {
        VerificationResult {
            keyspace,
            unopenable: None,
            checks,
        }
    }

    /// Result for an engine that failed to open
    pub fn unopenable(keyspace: Keyspace, reason: impl Into<String>) -> Self {
        VerificationResult {
            keyspace,
            unopenable: Some(reason.into()),
            checks: Vec::new(),
        }
    }

    /// Keyspace that was verified
    pub fn keyspace(&self) -> Keyspace {
        self.keyspace
    }

    /// Per-key checks in index order
    pub fn checks(&self) -> &[KeyCheck] {
        &self.checks
    }

    /// Reason the engine could not be opened, if it could not
    pub fn unopenable_reason(&self) -> Option<&str> {
        self.unopenable.as_deref()
    }

    /// Whether the engine could not be opened
    pub fn is_unopenable(&self) -> bool {
        self.unopenable.is_some()
    }

    /// Aggregate counts
    pub fn summary(&self) -> VerificationSummary {
        let mut summary = VerificationSummary {
            total_checked: self.checks.len() as u64,
            unopenable: self.is_unopenable(),
            ..Default::default()
        };
        for check in &self.checks {
            match check.outcome {
                KeyOutcome::Match => summary.matched += 1,
                KeyOutcome::Missing => {
                    summary.read_errors += 1;
                    summary.missing += 1;
                }
                KeyOutcome::ReadError(_) => summary.read_errors += 1,
                KeyOutcome::Mismatch { .. } => summary.mismatches += 1,
            }
        }
        summary
    }

    /// No key returned a wrong value
    pub fn is_fail_closed(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|c| matches!(c.outcome, KeyOutcome::Mismatch { .. }))
    }

    /// Every key matched and the engine opened
    pub fn is_intact(&self) -> bool {
        !self.is_unopenable() && self.checks.iter().all(|c| c.outcome == KeyOutcome::Match)
    }

    /// Coarse classification of this result
    pub fn failure_class(&self) -> FailureClass {
        if self.is_unopenable() {
            FailureClass::Unopenable
        } else if !self.is_fail_closed() {
            FailureClass::Mismatching
        } else if self.is_intact() {
            FailureClass::Intact
        } else {
            FailureClass::FailClosed
        }
    }

    /// Every mismatch with full detail, in index order
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.checks
            .iter()
            .filter_map(|check| match &check.outcome {
                KeyOutcome::Mismatch { actual } => Some(Mismatch {
                    index: check.index,
                    key: Keyspace::key(check.index),
                    expected: Keyspace::value(check.index),
                    actual: actual.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Indices that were missing or erroring, in index order
    pub fn read_error_indices(&self) -> Vec<u64> {
        self.checks
            .iter()
            .filter(|c| c.outcome.is_read_error())
            .map(|c| c.index)
            .collect()
    }

    /// Outcome for one index, if it was checked
    pub fn outcome(&self, index: u64) -> Option<&KeyOutcome> {
        let offset = index.checked_sub(self.keyspace.lo())?;
        self.checks
            .get(offset as usize)
            .filter(|c| c.index == index)
            .map(|c| &c.outcome)
    }

    /// Whether every index in `[keyspace.lo, bound)` matched
    pub fn all_match_below(&self, bound: u64) -> bool {
        !self.is_unopenable()
            && self
                .checks
                .iter()
                .filter(|c| c.index < bound)
                .all(|c| c.outcome == KeyOutcome::Match)
    }

    /// Classify the read-errors by the order they are contiguous in
    pub fn loss_pattern(&self) -> LossPattern {
        if self.is_unopenable() {
            return LossPattern::Unopenable;
        }
        let lost = self.read_error_indices();
        let (Some(&first), Some(&last)) = (lost.first(), lost.last()) else {
            return LossPattern::None;
        };
        if last - first + 1 == lost.len() as u64 {
            return LossPattern::IndexRun { first, last };
        }

        let mut ordered: Vec<(Vec<u8>, bool)> = self
            .checks
            .iter()
            .map(|c| (Keyspace::key(c.index), c.outcome.is_read_error()))
            .collect();
        ordered.sort();
        let positions: Vec<usize> = ordered
            .iter()
            .enumerate()
            .filter(|(_, (_, lost))| *lost)
            .map(|(pos, _)| pos)
            .collect();
        let lo = positions[0];
        let hi = positions[positions.len() - 1];
        if hi - lo + 1 == positions.len() {
            LossPattern::KeyRange {
                low: String::from_utf8_lossy(&ordered[lo].0).into_owned(),
                high: String::from_utf8_lossy(&ordered[hi].0).into_owned(),
            }
        } else {
            LossPattern::Scattered { count: lost.len() }
        }
    }
}
