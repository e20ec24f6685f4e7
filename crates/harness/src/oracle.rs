//! Integrity oracle
//!
//! Reads every key of a keyspace once, without retries, and classifies each
//! outcome:
//!
//! | Engine returns            | Outcome      | Treatment                 |
//! |---------------------------|--------------|---------------------------|
//! | expected value            | match        | -                         |
//! | absent                    | read-error   | logged, tolerated         |
//! | error                     | read-error   | logged, tolerated         |
//! | any other value           | mismatch     | always a hard failure     |
//! | (open failed)             | unopenable   | logged, tolerated         |
//!
//! A wrong value is silent corruption; everything else is the engine failing
//! closed.

use fracture_core::{
    EngineError, Error, KeyCheck, KeyOutcome, Keyspace, Result, VerificationResult,
};
use fracture_engine::{EngineHandle, OpenOptions, StorageEngine};
use std::path::Path;
use tracing::{debug, error, warn};

/// Verify `keyspace` against an open handle
pub fn verify(handle: &mut dyn EngineHandle, keyspace: Keyspace) -> VerificationResult {
    let checks = keyspace
        .iter()
        .map(|entry| {
            let outcome = match handle.get(&entry.key) {
                Ok(Some(actual)) if actual == entry.value => KeyOutcome::Match,
                Ok(Some(actual)) => {
                    error!(
                        target: "fracture::oracle",
                        key = %String::from_utf8_lossy(&entry.key),
                        got = %String::from_utf8_lossy(&actual),
                        want = %String::from_utf8_lossy(&entry.value),
                        "Wrong value returned"
                    );
                    KeyOutcome::Mismatch { actual }
                }
                Ok(None) => {
                    debug!(
                        target: "fracture::oracle",
                        key = %String::from_utf8_lossy(&entry.key),
                        "Key missing"
                    );
                    KeyOutcome::Missing
                }
                Err(e) => {
                    debug!(
                        target: "fracture::oracle",
                        key = %String::from_utf8_lossy(&entry.key),
                        error = %e,
                        "Key read failed"
                    );
                    KeyOutcome::ReadError(e.message)
                }
            };
            KeyCheck {
                index: entry.index,
                outcome,
            }
        })
        .collect();

    let result = VerificationResult::from_checks(keyspace, checks);
    let summary = result.summary();
    if summary.read_errors > 0 {
        warn!(
            target: "fracture::oracle",
            checked = summary.total_checked,
            read_errors = summary.read_errors,
            missing = summary.missing,
            loss = ?result.loss_pattern(),
            "Verification found unreadable keys"
        );
    } else {
        debug!(
            target: "fracture::oracle",
            checked = summary.total_checked,
            mismatches = summary.mismatches,
            "Verification complete"
        );
    }
    result
}

/// Per-key outcomes of a directory check, plus how the close after it went
#[derive(Debug)]
pub struct DirectoryCheck {
    /// Outcomes of every key, complete even when the close failed
    pub result: VerificationResult,
    /// `Ok` when the close succeeded or the engine never opened
    pub close: std::result::Result<(), EngineError>,
}

impl DirectoryCheck {
    /// Collapse into one `Result`
    ///
    /// A wrong value outranks a close failure.
    pub fn into_result(self) -> Result<VerificationResult> {
        if let Err(e) = self.close {
            ensure_fail_closed(&self.result)?;
            return Err(e.into());
        }
        Ok(self.result)
    }
}

/// Open `dir`, verify `keyspace`, and close again
///
/// An open failure is not an error: the result is marked unopenable. The
/// close outcome is kept apart from the result so a failed close never hides
/// the values that were read.
pub fn check_directory(
    engine: &dyn StorageEngine,
    dir: &Path,
    options: &OpenOptions,
    keyspace: Keyspace,
) -> DirectoryCheck {
    let mut handle = match engine.open(dir, options) {
        Ok(handle) => handle,
        Err(e) => {
            warn!(
                target: "fracture::oracle",
                engine = engine.name(),
                dir = %dir.display(),
                error = %e,
                "Engine unopenable, skipping per-key verification"
            );
            return DirectoryCheck {
                result: VerificationResult::unopenable(keyspace, e.message),
                close: Ok(()),
            };
        }
    };
    let result = verify(handle.as_mut(), keyspace);
    let close = handle.close();
    if let Err(e) = &close {
        warn!(
            target: "fracture::oracle",
            engine = engine.name(),
            dir = %dir.display(),
            error = %e,
            "Close after verification failed"
        );
    }
    DirectoryCheck { result, close }
}

/// [`check_directory`] as a single `Result`
///
/// A close failure is returned unless a wrong value was read, in which case
/// the integrity mismatch is returned instead.
pub fn verify_directory(
    engine: &dyn StorageEngine,
    dir: &Path,
    options: &OpenOptions,
    keyspace: Keyspace,
) -> Result<VerificationResult> {
    check_directory(engine, dir, options, keyspace).into_result()
}

/// `Ok` unless the result holds a wrong value
pub fn ensure_fail_closed(result: &VerificationResult) -> Result<()> {
    let mismatches = result.mismatches();
    match mismatches.first() {
        None => Ok(()),
        Some(first) => Err(Error::IntegrityMismatch {
            count: mismatches.len(),
            first: first.clone(),
        }),
    }
}
