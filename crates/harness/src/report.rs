//! Scenario reports
//!
//! A report is the structured record of one scenario run, handed to whatever
//! collects test results. It is built up phase by phase and always carries a
//! verdict, including for runs that aborted or timed out part-way.

use chrono::{DateTime, Utc};
use fracture_core::{
    ArtifactClass, CorruptionRecord, EngineOp, Error, LossPattern, Mismatch, Result,
    VerificationResult, VerificationSummary,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Phases of a scenario, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Create the storage directory
    Provision,
    /// Write the original keyspace and close
    Populate,
    /// Reopen and verify before corrupting
    Baseline,
    /// Locate the artifact and corrupt it
    Corrupt,
    /// Reopen and verify the original keyspace
    PrimaryVerify,
    /// Reopen again and compare aggregates with the primary verify
    IdempotenceRecheck,
    /// Write the extra keyspace
    WriteMore,
    /// Verify original plus extra keys
    VerifyExtended,
    /// Compact the original key range
    Compact,
    /// Verify after compaction
    VerifyCompacted,
    /// Repeated random corruption
    RandomSweep,
}

impl Phase {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Provision => "provision",
            Phase::Populate => "populate",
            Phase::Baseline => "baseline",
            Phase::Corrupt => "corrupt",
            Phase::PrimaryVerify => "primary_verify",
            Phase::IdempotenceRecheck => "idempotence_recheck",
            Phase::WriteMore => "write_more",
            Phase::VerifyExtended => "verify_extended",
            Phase::Compact => "compact",
            Phase::VerifyCompacted => "verify_compacted",
            Phase::RandomSweep => "random_sweep",
        }
    }

    /// Whether an engine error in this phase aborts the scenario
    pub fn is_mandatory(&self) -> bool {
        matches!(
            self,
            Phase::Provision | Phase::Populate | Phase::Corrupt | Phase::PrimaryVerify
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Completed with nothing to note
    Passed,
    /// Completed with expected degraded-mode signals
    Degraded,
    /// Failed the scenario
    Failed,
    /// Not enabled for this scenario, or not reached
    Skipped,
}

/// Record of one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase
    pub phase: Phase,
    /// Outcome
    pub status: PhaseStatus,
    /// Wall time spent
    pub duration_ms: u64,
    /// Aggregates, for verification phases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<VerificationSummary>,
    /// Shape of the read-errors, for verification phases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<LossPattern>,
    /// Free-form detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PhaseReport {
    /// Phase record without verification data
    pub fn new(phase: Phase, status: PhaseStatus, duration: Duration) -> Self {
        PhaseReport {
            phase,
            status,
            duration_ms: duration.as_millis() as u64,
            summary: None,
            loss: None,
            note: None,
        }
    }

    /// Record for a verification phase; status follows the result
    pub fn verification(phase: Phase, result: &VerificationResult, duration: Duration) -> Self {
        let summary = result.summary();
        let status = if summary.mismatches > 0 {
            PhaseStatus::Failed
        } else if result.is_intact() {
            PhaseStatus::Passed
        } else {
            PhaseStatus::Degraded
        };
        let mut report = PhaseReport::new(phase, status, duration);
        report.summary = Some(summary);
        report.loss = Some(result.loss_pattern());
        report.note = result.unopenable_reason().map(|r| format!("unopenable: {r}"));
        report
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Final outcome of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No mismatch, no abort
    Passed,
    /// A mismatch, an abort, or an engine crash
    Failed,
    /// The external timeout expired
    TimedOut,
}

/// Why a scenario did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Error kind, see [`Error::kind`]
    pub kind: String,
    /// Error display
    pub message: String,
    /// Engine operation that failed, for engine errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<EngineOp>,
    /// Phase the failure happened in, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl FailureDetail {
    /// Detail for `error` raised in `phase`
    pub fn from_error(error: &Error, phase: Option<Phase>) -> Self {
        FailureDetail {
            kind: error.kind().to_string(),
            message: error.to_string(),
            op: match error {
                Error::Engine(e) => Some(e.op),
                _ => None,
            },
            phase,
        }
    }
}

/// Structured record of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Scenario name
    pub scenario: String,
    /// Engine under test
    pub engine: String,
    /// Artifact class the scenario corrupts
    pub artifact_class: ArtifactClass,
    /// Seed of the scenario's random source
    pub seed: u64,
    /// The primary corruption, once applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corruption: Option<CorruptionRecord>,
    /// Corruptions applied by the random sweep
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sweep: Vec<CorruptionRecord>,
    /// Phase records, in execution order
    pub phases: Vec<PhaseReport>,
    /// Read-errors summed over every verification after corruption
    pub read_errors: u64,
    /// Every wrong value observed, with full detail
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    /// Final outcome
    pub verdict: Verdict,
    /// Why the scenario did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    /// Total wall time
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Empty, passing report for a run starting now
    pub fn new(
        scenario: impl Into<String>,
        engine: impl Into<String>,
        artifact_class: ArtifactClass,
        seed: u64,
    ) -> Self {
        ScenarioReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            scenario: scenario.into(),
            engine: engine.into(),
            artifact_class,
            seed,
            corruption: None,
            sweep: Vec::new(),
            phases: Vec::new(),
            read_errors: 0,
            mismatches: Vec::new(),
            verdict: Verdict::Passed,
            failure: None,
            duration_ms: 0,
        }
    }

    /// Append a phase record
    pub fn push(&mut self, phase: PhaseReport) {
        self.phases.push(phase);
    }

    /// Append a verification record and fold its aggregates into the totals
    ///
    /// The baseline does not count towards `read_errors`: it precedes the
    /// corruption.
    pub fn push_verification(
        &mut self,
        phase: Phase,
        result: &VerificationResult,
        duration: Duration,
    ) {
        if phase != Phase::Baseline {
            self.read_errors += result.summary().read_errors;
        }
        self.mismatches.extend(result.mismatches());
        self.push(PhaseReport::verification(phase, result, duration));
    }

    /// Record for `phase`, if it ran
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Status of `phase`; phases without a record were skipped
    pub fn status(&self, phase: Phase) -> PhaseStatus {
        self.phase(phase)
            .map(|p| p.status)
            .unwrap_or(PhaseStatus::Skipped)
    }

    /// Mark the run failed with `error`
    pub fn fail(&mut self, error: &Error, phase: Option<Phase>) {
        self.verdict = Verdict::Failed;
        self.failure = Some(FailureDetail::from_error(error, phase));
    }

    /// Mark the run timed out while `phase` was running
    pub fn time_out(&mut self, elapsed: Duration, phase: Option<Phase>) {
        let error = Error::ScenarioTimeout {
            scenario: self.scenario.clone(),
            elapsed,
        };
        self.verdict = Verdict::TimedOut;
        self.failure = Some(FailureDetail::from_error(&error, phase));
        self.duration_ms = elapsed.as_millis() as u64;
    }

    /// Set the total wall time
    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
    }

    /// Last phase that produced a record
    pub fn last_phase(&self) -> Option<Phase> {
        self.phases.last().map(|p| p.phase)
    }

    /// Whether the verdict is `Passed`
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }

    /// Whether any phase ran degraded
    pub fn degraded(&self) -> bool {
        self.phases.iter().any(|p| p.status == PhaseStatus::Degraded)
    }

    /// Pretty JSON for the report collector
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Parse a report written by [`ScenarioReport::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// `Ok` for a passing run, otherwise the error that best describes it
    pub fn ensure_passed(&self) -> Result<()> {
        if self.passed() {
            return Ok(());
        }
        if let Some(first) = self.mismatches.first() {
            return Err(Error::IntegrityMismatch {
                count: self.mismatches.len(),
                first: first.clone(),
            });
        }
        if self.verdict == Verdict::TimedOut {
            return Err(Error::ScenarioTimeout {
                scenario: self.scenario.clone(),
                elapsed: Duration::from_millis(self.duration_ms),
            });
        }
        let (kind, message, op) = match &self.failure {
            Some(f) => (f.kind.as_str(), f.message.clone(), f.op),
            None => ("unknown", "scenario failed".to_string(), None),
        };
        Err(match (kind, op) {
            ("engine_panic", _) => Error::EnginePanic {
                scenario: self.scenario.clone(),
                message,
            },
            ("engine_error", Some(op)) => Error::Engine(fracture_core::EngineError {
                op,
                message: strip_engine_prefix(&message, op),
            }),
            _ => Error::ScenarioAborted {
                scenario: self.scenario.clone(),
                kind: kind.to_string(),
                message,
            },
        })
    }
}

/// Undo the `engine {op} failed: ` prefix the error display adds
fn strip_engine_prefix(message: &str, op: EngineOp) -> String {
    let prefix = format!("engine {op} failed: ");
    message
        .strip_prefix(&prefix)
        .unwrap_or(message)
        .to_string()
}
