//! Scenario runner
//!
//! Drives one scenario through its phases in strict program order. The engine
//! is always closed before an artifact is touched, and no two handles are
//! ever open at once.
//!
//! Error policy per phase:
//! - harness defects (missing or empty artifact, filesystem, layout) abort
//! - engine errors abort mandatory phases and degrade optional ones
//! - an engine that cannot be opened for verification is degraded, not failed
//! - a wrong value read back fails the scenario wherever it appears, even
//!   when the close after the read fails
//!
//! [`ScenarioRunner::run`] executes on a dedicated thread so a hanging engine
//! trips the external timeout and a panicking engine fails only its scenario.

use crate::config::HarnessConfig;
use crate::context::ScenarioContext;
use crate::oracle::{check_directory, ensure_fail_closed};
use crate::report::{Phase, PhaseReport, PhaseStatus, ScenarioReport};
use crate::scenario::Scenario;
use fracture_core::{
    ArtifactClass, CorruptionSpec, EngineError, Error, Keyspace, OffsetPolicy, Result,
    VerificationResult, VerificationSummary,
};
use fracture_engine::{engine_for, OpenOptions, StorageEngine};
use fracture_storage::{corrupt, locate};
use std::any::Any;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Runs scenarios against one engine
#[derive(Clone)]
pub struct ScenarioRunner {
    engine: Arc<dyn StorageEngine>,
    config: HarnessConfig,
}

enum Progress {
    Started(Phase),
    Snapshot(Box<ScenarioReport>),
}

impl ScenarioRunner {
    /// Runner over an explicit engine
    pub fn new(engine: Arc<dyn StorageEngine>, config: HarnessConfig) -> Self {
        ScenarioRunner { engine, config }
    }

    /// Runner over the engine family named by the configuration
    pub fn from_config(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let engine = engine_for(config.engine)?;
        Ok(ScenarioRunner::new(engine, config))
    }

    /// Engine under test
    pub fn engine(&self) -> &dyn StorageEngine {
        self.engine.as_ref()
    }

    /// Configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `scenario` in a fresh context on a scenario thread
    ///
    /// Never returns an error: every outcome, including a timeout or a panic,
    /// is a verdict in the report.
    pub fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();
        let worker = {
            let runner = self.clone();
            let scenario = scenario.clone();
            thread::Builder::new()
                .name(format!("fracture-{}", scenario.name))
                .spawn(move || {
                    let report = runner.run_fresh(&scenario, Some(&tx));
                    let _ = tx.send(Progress::Snapshot(Box::new(report)));
                })
        };
        let worker = match worker {
            Ok(worker) => worker,
            Err(e) => {
                warn!(
                    target: "fracture::scenario",
                    scenario = %scenario.name,
                    error = %e,
                    "Could not spawn scenario thread, running inline without timeout"
                );
                return self.run_fresh(scenario, None);
            }
        };

        let deadline = self.config.scenario_timeout().map(|t| started + t);
        let mut latest: Option<ScenarioReport> = None;
        let mut current = Phase::Provision;
        loop {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(Progress::Started(phase)) => current = phase,
                Ok(Progress::Snapshot(report)) => latest = Some(*report),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    let elapsed = started.elapsed();
                    error!(
                        target: "fracture::scenario",
                        scenario = %scenario.name,
                        phase = %current,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Scenario timed out; abandoning its thread"
                    );
                    let mut report = latest.unwrap_or_else(|| self.empty_report(scenario));
                    report.time_out(elapsed, Some(current));
                    return report;
                }
            }
        }

        match worker.join() {
            Ok(()) => latest.unwrap_or_else(|| self.empty_report(scenario)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: "fracture::scenario",
                    scenario = %scenario.name,
                    phase = %current,
                    panic = %message,
                    "Engine panicked"
                );
                let mut report = latest.unwrap_or_else(|| self.empty_report(scenario));
                let err = Error::EnginePanic {
                    scenario: scenario.name.clone(),
                    message,
                };
                report.push(PhaseReport::new(current, PhaseStatus::Failed, Duration::ZERO));
                report.fail(&err, Some(current));
                report.finish(started.elapsed());
                report
            }
        }
    }

    /// Run `scenario` on the calling thread in a caller-owned context
    ///
    /// No timeout or panic isolation. The context's directory is left in place
    /// for inspection.
    pub fn run_in(&self, scenario: &Scenario, ctx: &mut ScenarioContext) -> ScenarioReport {
        let started = Instant::now();
        let mut report = self.empty_report(scenario);
        report.seed = ctx.seed();
        report.push(PhaseReport::new(
            Phase::Provision,
            PhaseStatus::Passed,
            Duration::ZERO,
        ));
        self.execute(scenario, ctx, &mut report, None, started);
        report
    }

    fn run_fresh(&self, scenario: &Scenario, tx: Option<&Sender<Progress>>) -> ScenarioReport {
        let started = Instant::now();
        let mut report = self.empty_report(scenario);
        let mut ctx = match ScenarioContext::new(self.config.seed, self.config.keyspace()) {
            Ok(ctx) => ctx,
            Err(e) => {
                report.push(PhaseReport::new(
                    Phase::Provision,
                    PhaseStatus::Failed,
                    started.elapsed(),
                ));
                report.fail(&e, Some(Phase::Provision));
                report.finish(started.elapsed());
                return report;
            }
        };
        report.push(PhaseReport::new(
            Phase::Provision,
            PhaseStatus::Passed,
            started.elapsed(),
        ));
        if let Some(tx) = tx {
            let _ = tx.send(Progress::Snapshot(Box::new(report.clone())));
        }
        self.execute(scenario, &mut ctx, &mut report, tx, started);
        report
    }

    fn empty_report(&self, scenario: &Scenario) -> ScenarioReport {
        ScenarioReport::new(
            scenario.name.clone(),
            self.engine.name(),
            scenario.class(),
            self.config.seed,
        )
    }

    fn execute(
        &self,
        scenario: &Scenario,
        ctx: &mut ScenarioContext,
        report: &mut ScenarioReport,
        tx: Option<&Sender<Progress>>,
        started: Instant,
    ) {
        info!(
            target: "fracture::scenario",
            scenario = %scenario.name,
            engine = self.engine.name(),
            class = %scenario.class(),
            keys = ctx.keyspace().len(),
            seed = ctx.seed(),
            "Scenario started"
        );
        let mut run = Execution {
            engine: self.engine.as_ref(),
            config: &self.config,
            scenario,
            ctx,
            report,
            tx,
            current: Phase::Provision,
        };
        let outcome = run.phases();
        let current = run.current;

        if let Err(e) = outcome {
            if report.last_phase() != Some(current) {
                report.push(PhaseReport::new(current, PhaseStatus::Failed, Duration::ZERO));
            }
            error!(
                target: "fracture::scenario",
                scenario = %scenario.name,
                phase = %current,
                kind = e.kind(),
                error = %e,
                "Scenario failed"
            );
            report.fail(&e, Some(current));
        }
        report.finish(started.elapsed());
        info!(
            target: "fracture::scenario",
            scenario = %scenario.name,
            verdict = ?report.verdict,
            read_errors = report.read_errors,
            mismatches = report.mismatches.len(),
            duration_ms = report.duration_ms,
            "Scenario finished"
        );
    }
}

/// State of one scenario in flight
struct Execution<'a> {
    engine: &'a dyn StorageEngine,
    config: &'a HarnessConfig,
    scenario: &'a Scenario,
    ctx: &'a mut ScenarioContext,
    report: &'a mut ScenarioReport,
    tx: Option<&'a Sender<Progress>>,
    current: Phase,
}

impl Execution<'_> {
    fn phases(&mut self) -> Result<()> {
        let original = self.ctx.keyspace();
        let extra = original.following(self.config.extra_key_count);

        self.populate(original)?;
        if self.scenario.baseline {
            self.baseline(original)?;
        }
        self.corrupt()?;
        let primary = self.verify(Phase::PrimaryVerify, original)?;
        if self.scenario.idempotence_recheck {
            self.recheck(original, primary)?;
        }

        let mut written = original;
        if self.scenario.write_more && self.write_more(extra)? {
            written = original.extended(self.config.extra_key_count);
        }
        if self.scenario.verify_extended {
            self.verify_extended(written, extra)?;
        }
        if self.scenario.compact {
            self.compact(original)?;
            self.verify(Phase::VerifyCompacted, written)?;
        }
        if let Some(rounds) = self.scenario.random_sweep {
            self.sweep(rounds, written)?;
        }
        Ok(())
    }

    fn begin(&mut self, phase: Phase) -> Instant {
        self.current = phase;
        debug!(
            target: "fracture::scenario",
            scenario = %self.scenario.name,
            %phase,
            "Phase started"
        );
        if let Some(tx) = self.tx {
            let _ = tx.send(Progress::Started(phase));
        }
        Instant::now()
    }

    fn record(&mut self, phase: PhaseReport) {
        self.report.push(phase);
        self.publish();
    }

    fn publish(&self) {
        if let Some(tx) = self.tx {
            let _ = tx.send(Progress::Snapshot(Box::new(self.report.clone())));
        }
    }

    fn open_options(&self) -> OpenOptions {
        self.config.open
    }

    /// Open, write `keyspace`, close
    ///
    /// With `flush` the written range is compacted before the close, which
    /// moves the memtable into a sorted table.
    fn write(&self, keyspace: Keyspace, flush: bool) -> Result<()> {
        let options = self.open_options().with_create_if_missing(true);
        let mut handle = self.engine.open(self.ctx.dir(), &options)?;
        for entry in keyspace.iter() {
            handle.put(&entry.key, &entry.value)?;
        }
        if let (true, Some((low, high))) = (flush, keyspace.key_bounds()) {
            handle.compact(&low, &high)?;
        }
        handle.close()?;
        Ok(())
    }

    /// Table scenarios flush on populate; reopening alone may replay the
    /// log into a memtable without writing a table
    fn populate(&mut self, keyspace: Keyspace) -> Result<()> {
        let started = self.begin(Phase::Populate);
        let flush = self.scenario.class() == ArtifactClass::SortedTable;
        self.write(keyspace, flush)?;
        debug!(
            target: "fracture::scenario",
            scenario = %self.scenario.name,
            keys = keyspace.len(),
            flush,
            "Keyspace written"
        );
        let note = if flush {
            format!("wrote {} keys, compacted into a sorted table", keyspace.len())
        } else {
            format!("wrote {} keys", keyspace.len())
        };
        self.record(
            PhaseReport::new(Phase::Populate, PhaseStatus::Passed, started.elapsed())
                .with_note(note),
        );
        Ok(())
    }

    fn baseline(&mut self, keyspace: Keyspace) -> Result<()> {
        let started = self.begin(Phase::Baseline);
        let options = self.open_options();
        let check = check_directory(self.engine, self.ctx.dir(), &options, keyspace);
        let result = check.result;
        self.report
            .push_verification(Phase::Baseline, &result, started.elapsed());
        self.publish();
        ensure_fail_closed(&result)?;
        if let Err(e) = check.close {
            self.close_failed(Phase::Baseline, e)?;
        }
        if !result.is_intact() {
            let summary = result.summary();
            return Err(Error::ScenarioAborted {
                scenario: self.scenario.name.clone(),
                kind: "baseline_not_intact".into(),
                message: format!(
                    "{} of {} keys unreadable before any corruption (unopenable: {})",
                    summary.read_errors, keyspace.len(), summary.unopenable
                ),
            });
        }
        Ok(())
    }

    /// Structural specs without a fallback borrow the configured magic offset
    fn corruption_spec(&self) -> CorruptionSpec {
        let spec = self.scenario.corruption;
        match spec.offset {
            OffsetPolicy::Structural { fallback: None, .. } => {
                match self.config.empirical_offset(spec.class) {
                    Some(empirical) => spec.with_fallback(empirical.offset),
                    None => spec,
                }
            }
            _ => spec,
        }
    }

    fn corrupt(&mut self) -> Result<()> {
        let started = self.begin(Phase::Corrupt);
        let spec = self.corruption_spec();
        let artifact = locate(self.ctx.dir(), spec.class)?;
        let record = corrupt(&artifact, &spec, self.ctx.rng())?;

        let status = if record.changed {
            PhaseStatus::Passed
        } else {
            PhaseStatus::Degraded
        };
        let note = format!(
            "{} at offset {} ({:?}){}",
            record.artifact.file_name(),
            record.offset,
            record.source,
            if record.changed { "" } else { ", byte unchanged" }
        );
        self.report.corruption = Some(record);
        self.record(PhaseReport::new(Phase::Corrupt, status, started.elapsed()).with_note(note));
        Ok(())
    }

    /// Verify `keyspace`; mismatches are fatal, then close failures follow
    /// the phase's error policy
    fn verify(&mut self, phase: Phase, keyspace: Keyspace) -> Result<VerificationResult> {
        let started = self.begin(phase);
        let options = self.open_options();
        let check = check_directory(self.engine, self.ctx.dir(), &options, keyspace);
        self.report
            .push_verification(phase, &check.result, started.elapsed());
        self.publish();
        ensure_fail_closed(&check.result)?;
        if let Err(e) = check.close {
            self.close_failed(phase, e)?;
        }
        Ok(check.result)
    }

    fn recheck(&mut self, keyspace: Keyspace, primary: VerificationResult) -> Result<()> {
        let again = self.verify(Phase::IdempotenceRecheck, keyspace)?;
        let (first, second) = (primary.summary(), again.summary());
        if first != second {
            warn!(
                target: "fracture::scenario",
                scenario = %self.scenario.name,
                first = ?first,
                second = ?second,
                "Reopening changed read outcomes"
            );
            self.amend_last(PhaseStatus::Degraded, aggregate_diff(&first, &second));
        }
        Ok(())
    }

    /// Returns whether the extra keys were written
    fn write_more(&mut self, extra: Keyspace) -> Result<bool> {
        let started = self.begin(Phase::WriteMore);
        match self.write(extra, false) {
            Ok(()) => {
                self.record(
                    PhaseReport::new(Phase::WriteMore, PhaseStatus::Passed, started.elapsed())
                        .with_note(format!("wrote {} keys", extra.len())),
                );
                Ok(true)
            }
            Err(e) => self.degrade_or_abort(Phase::WriteMore, started, e).map(|()| false),
        }
    }

    fn verify_extended(&mut self, written: Keyspace, extra: Keyspace) -> Result<()> {
        let result = self.verify(Phase::VerifyExtended, written)?;
        if written.contains(extra.lo()) && !result.is_unopenable() {
            let lost = result
                .read_error_indices()
                .into_iter()
                .filter(|index| extra.contains(*index))
                .count();
            if lost > 0 {
                warn!(
                    target: "fracture::scenario",
                    scenario = %self.scenario.name,
                    lost,
                    "Keys written after corruption are unreadable"
                );
                self.amend_last(
                    PhaseStatus::Degraded,
                    format!("{lost} keys written after corruption unreadable"),
                );
            }
        }
        Ok(())
    }

    fn compact(&mut self, original: Keyspace) -> Result<()> {
        let started = self.begin(Phase::Compact);
        let Some((low, high)) = original.key_bounds() else {
            self.record(PhaseReport::new(
                Phase::Compact,
                PhaseStatus::Skipped,
                started.elapsed(),
            ));
            return Ok(());
        };
        match self.compact_range(&low, &high) {
            Ok(()) => {
                self.record(
                    PhaseReport::new(Phase::Compact, PhaseStatus::Passed, started.elapsed())
                        .with_note(format!(
                            "{} ..= {}",
                            String::from_utf8_lossy(&low),
                            String::from_utf8_lossy(&high)
                        )),
                );
                Ok(())
            }
            Err(e) => self.degrade_or_abort(Phase::Compact, started, e),
        }
    }

    fn compact_range(&self, low: &[u8], high: &[u8]) -> Result<()> {
        let mut handle = self.engine.open(self.ctx.dir(), &self.open_options())?;
        handle.compact(low, high)?;
        handle.close()?;
        Ok(())
    }

    /// Corrupt a fresh random offset per round, verifying after each
    fn sweep(&mut self, rounds: u32, keyspace: Keyspace) -> Result<()> {
        let started = self.begin(Phase::RandomSweep);
        let spec = CorruptionSpec::random(self.scenario.class())
            .with_operator(self.scenario.corruption.operator);
        let mut last = VerificationSummary::default();
        let mut unopenable = 0u32;
        let mut degraded = 0u32;
        let mut completed = 0u32;
        let mut close_failure = None;

        for round in 0..rounds {
            let artifact = locate(self.ctx.dir(), spec.class)?;
            let record = corrupt(&artifact, &spec, self.ctx.rng())?;
            debug!(
                target: "fracture::scenario",
                scenario = %self.scenario.name,
                round,
                offset = record.offset,
                "Sweep corruption applied"
            );
            self.report.sweep.push(record);

            let options = self.open_options();
            let check = check_directory(self.engine, self.ctx.dir(), &options, keyspace);
            let result = check.result;
            completed += 1;
            last = result.summary();
            self.report.read_errors += last.read_errors;
            self.report.mismatches.extend(result.mismatches());
            if result.is_unopenable() {
                unopenable += 1;
            }
            if !result.is_intact() {
                degraded += 1;
            }
            if let Err(e) = ensure_fail_closed(&result) {
                self.publish();
                return Err(e);
            }
            // an unclosed engine leaves the directory in an unknown state
            if let Err(e) = check.close {
                warn!(
                    target: "fracture::scenario",
                    scenario = %self.scenario.name,
                    round,
                    error = %e,
                    "Sweep stopped by close failure"
                );
                close_failure = Some(format!("round {round}: {}", Error::from(e)));
                break;
            }
        }

        let status = if degraded > 0 || close_failure.is_some() {
            PhaseStatus::Degraded
        } else {
            PhaseStatus::Passed
        };
        let mut note = format!(
            "{completed} of {rounds} rounds: {degraded} degraded, {unopenable} unopenable"
        );
        if let Some(failure) = close_failure {
            note = format!("{note}; stopped after {failure}");
        }
        let mut phase =
            PhaseReport::new(Phase::RandomSweep, status, started.elapsed()).with_note(note);
        phase.summary = Some(last);
        self.record(phase);
        Ok(())
    }

    /// Engine errors in optional phases degrade them; anything else aborts
    fn degrade_or_abort(&mut self, phase: Phase, started: Instant, e: Error) -> Result<()> {
        if phase.is_mandatory() || !matches!(e, Error::Engine(_)) {
            return Err(e);
        }
        warn!(
            target: "fracture::scenario",
            scenario = %self.scenario.name,
            %phase,
            error = %e,
            "Optional phase degraded by engine error"
        );
        self.record(
            PhaseReport::new(phase, PhaseStatus::Degraded, started.elapsed())
                .with_note(e.to_string()),
        );
        Ok(())
    }

    /// The close after a recorded verification failed
    ///
    /// Mandatory phases and the baseline abort, since corruption must not
    /// follow an unclosed engine. Other phases are degraded.
    fn close_failed(&mut self, phase: Phase, e: EngineError) -> Result<()> {
        let e = Error::from(e);
        if phase.is_mandatory() || phase == Phase::Baseline {
            if let Some(last) = self.report.phases.last_mut() {
                last.status = PhaseStatus::Failed;
            }
            return Err(e);
        }
        warn!(
            target: "fracture::scenario",
            scenario = %self.scenario.name,
            %phase,
            error = %e,
            "Optional phase degraded by close failure"
        );
        self.amend_last(PhaseStatus::Degraded, e.to_string());
        Ok(())
    }

    fn amend_last(&mut self, status: PhaseStatus, note: String) {
        if let Some(last) = self.report.phases.last_mut() {
            if last.status == PhaseStatus::Passed {
                last.status = status;
            }
            last.note = Some(match last.note.take() {
                Some(existing) => format!("{existing}; {note}"),
                None => note,
            });
        }
        self.publish();
    }
}

fn aggregate_diff(first: &VerificationSummary, second: &VerificationSummary) -> String {
    format!(
        "aggregates changed on reopen: matched {} -> {}, read_errors {} -> {}, unopenable {} -> {}",
        first.matched,
        second.matched,
        first.read_errors,
        second.read_errors,
        first.unopenable,
        second.unopenable
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Verdict;
    use crate::testing::{table_frame_offset, JournalEngine, FRAME_HEADER_SIZE};

    fn execution<'a>(
        engine: &'a dyn StorageEngine,
        config: &'a HarnessConfig,
        scenario: &'a Scenario,
        ctx: &'a mut ScenarioContext,
        report: &'a mut ScenarioReport,
    ) -> Execution<'a> {
        Execution {
            engine,
            config,
            scenario,
            ctx,
            report,
            tx: None,
            current: Phase::Provision,
        }
    }

    /// Populate a table scenario and flip one byte of `index`'s value
    fn damaged_table(
        config: &HarnessConfig,
        scenario: &Scenario,
        ctx: &mut ScenarioContext,
        report: &mut ScenarioReport,
        index: u64,
    ) {
        let keyspace = ctx.keyspace();
        let engine = JournalEngine::new();
        execution(&engine, config, scenario, ctx, report)
            .populate(keyspace)
            .unwrap();
        let table = locate(ctx.dir(), ArtifactClass::SortedTable).unwrap();
        let offset = table_frame_offset(keyspace, index).unwrap()
            + FRAME_HEADER_SIZE as u64
            + Keyspace::key(index).len() as u64;
        let mut data = std::fs::read(&table.path).unwrap();
        data[offset as usize] ^= 0xFF;
        std::fs::write(&table.path, data).unwrap();
    }

    #[test]
    fn test_table_populate_leaves_a_table() {
        let config = HarnessConfig::for_testing();
        let scenario = Scenario::table_checksum(0);
        let mut ctx = ScenarioContext::new(1, Keyspace::first(30)).unwrap();
        let mut report = ScenarioReport::new("t", "journal", ArtifactClass::SortedTable, 1);
        let engine = JournalEngine::new();
        execution(&engine, &config, &scenario, &mut ctx, &mut report)
            .populate(Keyspace::first(30))
            .unwrap();

        assert!(locate(ctx.dir(), ArtifactClass::SortedTable).is_ok());
        let note = report.phase(Phase::Populate).unwrap().note.clone().unwrap();
        assert!(note.contains("compacted into a sorted table"));
    }

    #[test]
    fn test_mismatch_survives_close_failure_in_optional_phase() {
        let config = HarnessConfig::for_testing();
        let scenario = Scenario::table_checksum(0);
        let mut ctx = ScenarioContext::new(1, Keyspace::first(20)).unwrap();
        let mut report = ScenarioReport::new("t", "journal", ArtifactClass::SortedTable, 1);
        damaged_table(&config, &scenario, &mut ctx, &mut report, 7);

        let engine = JournalEngine::new().unverified().failing_close();
        let err = execution(&engine, &config, &scenario, &mut ctx, &mut report)
            .verify(Phase::VerifyExtended, Keyspace::first(20))
            .unwrap_err();

        assert!(matches!(err, Error::IntegrityMismatch { count: 1, .. }));
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].key, b"key-7".to_vec());
        let phase = report.phase(Phase::VerifyExtended).unwrap();
        assert_eq!(phase.status, PhaseStatus::Failed);
    }

    #[test]
    fn test_close_failure_degrades_optional_verify() {
        let config = HarnessConfig::for_testing();
        let scenario = Scenario::table_checksum(0);
        let mut ctx = ScenarioContext::new(1, Keyspace::first(20)).unwrap();
        let mut report = ScenarioReport::new("t", "journal", ArtifactClass::SortedTable, 1);
        let keyspace = ctx.keyspace();
        execution(&JournalEngine::new(), &config, &scenario, &mut ctx, &mut report)
            .populate(keyspace)
            .unwrap();

        let engine = JournalEngine::new().failing_close();
        let result = execution(&engine, &config, &scenario, &mut ctx, &mut report)
            .verify(Phase::VerifyCompacted, keyspace)
            .unwrap();

        assert!(result.is_intact());
        let phase = report.phase(Phase::VerifyCompacted).unwrap();
        assert_eq!(phase.status, PhaseStatus::Degraded);
        assert!(phase.note.as_deref().unwrap_or("").contains("fail close"));
    }

    #[test]
    fn test_close_failure_aborts_primary_verify() {
        let config = HarnessConfig::for_testing();
        let scenario = Scenario::table_checksum(0);
        let mut ctx = ScenarioContext::new(1, Keyspace::first(20)).unwrap();
        let mut report = ScenarioReport::new("t", "journal", ArtifactClass::SortedTable, 1);
        let keyspace = ctx.keyspace();
        execution(&JournalEngine::new(), &config, &scenario, &mut ctx, &mut report)
            .populate(keyspace)
            .unwrap();

        let engine = JournalEngine::new().failing_close();
        let err = execution(&engine, &config, &scenario, &mut ctx, &mut report)
            .verify(Phase::PrimaryVerify, keyspace)
            .unwrap_err();

        assert_eq!(err.kind(), "engine_error");
        let phase = report.phase(Phase::PrimaryVerify).unwrap();
        assert_eq!(phase.status, PhaseStatus::Failed);
    }

    #[test]
    fn test_close_failure_stops_sweep_without_aborting() {
        let config = HarnessConfig::for_testing();
        let scenario = Scenario::random_sweep(4);
        let mut ctx = ScenarioContext::new(1, Keyspace::first(20)).unwrap();
        let mut report = ScenarioReport::new("t", "journal", ArtifactClass::SortedTable, 1);
        let keyspace = ctx.keyspace();
        execution(&JournalEngine::new(), &config, &scenario, &mut ctx, &mut report)
            .populate(keyspace)
            .unwrap();

        let engine = JournalEngine::new().failing_close();
        execution(&engine, &config, &scenario, &mut ctx, &mut report)
            .sweep(4, keyspace)
            .unwrap();

        assert_eq!(report.sweep.len(), 1);
        let phase = report.phase(Phase::RandomSweep).unwrap();
        assert_eq!(phase.status, PhaseStatus::Degraded);
        let note = phase.note.as_deref().unwrap_or("");
        assert!(note.starts_with("1 of 4 rounds"));
        assert!(note.contains("stopped after round 0"));
    }

    #[test]
    fn test_structural_spec_borrows_configured_offset() {
        let runner = ScenarioRunner::new(
            Arc::new(JournalEngine::new()),
            HarnessConfig::for_testing(),
        );
        let mut ctx = ScenarioContext::new(1, Keyspace::first(1)).unwrap();
        let mut report = runner.empty_report(&Scenario::table_checksum(0));
        let scenario = Scenario::table_checksum(0);
        let run = Execution {
            engine: runner.engine(),
            config: runner.config(),
            scenario: &scenario,
            ctx: &mut ctx,
            report: &mut report,
            tx: None,
            current: Phase::Provision,
        };
        let expected = runner
            .config()
            .empirical_offset(ArtifactClass::SortedTable)
            .unwrap()
            .offset;
        assert!(matches!(
            run.corruption_spec().offset,
            OffsetPolicy::Structural { fallback: Some(offset), .. } if offset == expected
        ));
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_empty_report_carries_engine_and_class() {
        let runner = ScenarioRunner::new(
            Arc::new(JournalEngine::new()),
            HarnessConfig::for_testing(),
        );
        let report = runner.empty_report(&Scenario::wal_header_truncation(0));
        assert_eq!(report.engine, "journal");
        assert_eq!(report.artifact_class, ArtifactClass::WalSegment);
        assert_eq!(report.verdict, Verdict::Passed);
    }
}
