//! Behavioural drift self-check for empirical offsets
//!
//! The static check only says whether a magic offset still lands in the
//! region it was documented for. Calibration goes further: it produces a
//! fresh artifact with the documented write pattern, corrupts the offset and
//! confirms the engine still fails the way it was observed to.

use crate::config::HarnessConfig;
use crate::context::ScenarioContext;
use crate::oracle::check_directory;
use fracture_core::{
    ArtifactClass, CorruptionRecord, CorruptionSpec, FailureClass, Keyspace, Result,
};
use fracture_engine::StorageEngine;
use fracture_storage::{check_empirical_offset, corrupt, locate, EmpiricalOffset, OffsetDrift};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Outcome of calibrating one empirical offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Offset under test
    pub empirical: EmpiricalOffset,
    /// Static region check against the fresh artifact
    pub static_drift: OffsetDrift,
    /// Corruption applied, unless the offset was out of range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<CorruptionRecord>,
    /// Failure class the corruption produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<FailureClass>,
    /// Whether the offset no longer behaves as documented
    pub drifted: bool,
}

impl CalibrationReport {
    /// Failure class the offset is documented to produce
    pub fn expected(&self) -> Option<FailureClass> {
        self.empirical.expected_failure
    }
}

/// Calibrate one empirical offset against `engine`
///
/// Populates the configured keyspace in a fresh directory (compacting it for
/// table offsets, so a table exists), corrupts the offset with the default
/// operator and verifies the keyspace.
///
/// An unparseable layout is not drift on its own: engines whose format the
/// parser does not know are judged on behaviour alone.
pub fn calibrate(
    engine: &dyn StorageEngine,
    config: &HarnessConfig,
    empirical: &EmpiricalOffset,
) -> Result<CalibrationReport> {
    let keyspace = config.keyspace();
    let mut ctx = ScenarioContext::new(config.seed, keyspace)?;
    populate(engine, config, &ctx, keyspace, empirical.class)?;

    let artifact = locate(ctx.dir(), empirical.class)?;
    let static_drift = check_empirical_offset(&artifact, empirical)?;
    let statically_drifted = matches!(
        static_drift,
        OffsetDrift::Drifted { .. } | OffsetDrift::OutOfRange { .. }
    );
    if matches!(static_drift, OffsetDrift::OutOfRange { .. }) {
        return Ok(CalibrationReport {
            empirical: empirical.clone(),
            static_drift,
            record: None,
            observed: None,
            drifted: true,
        });
    }

    let spec = CorruptionSpec::fixed(empirical.class, empirical.offset);
    let record = corrupt(&artifact, &spec, ctx.rng())?;
    // the directory is discarded, so only the read outcomes matter
    let result = check_directory(engine, ctx.dir(), &config.open, keyspace).result;
    let observed = result.failure_class();

    let behaviour_drifted = empirical
        .expected_failure
        .is_some_and(|expected| expected != observed);
    let drifted = statically_drifted || behaviour_drifted;

    if observed == FailureClass::Mismatching {
        error!(
            target: "fracture::calibrate",
            engine = engine.name(),
            offset = empirical.offset,
            class = %empirical.class,
            mismatches = result.summary().mismatches,
            "Calibration corruption produced wrong values"
        );
    }
    if drifted {
        warn!(
            target: "fracture::calibrate",
            engine = engine.name(),
            offset = empirical.offset,
            class = %empirical.class,
            ?static_drift,
            expected = ?empirical.expected_failure,
            %observed,
            assumptions = %empirical.assumptions,
            "Empirical offset no longer behaves as documented"
        );
    } else {
        info!(
            target: "fracture::calibrate",
            engine = engine.name(),
            offset = empirical.offset,
            class = %empirical.class,
            %observed,
            "Empirical offset calibrated"
        );
    }

    Ok(CalibrationReport {
        empirical: empirical.clone(),
        static_drift,
        record: Some(record),
        observed: Some(observed),
        drifted,
    })
}

/// Calibrate every configured empirical offset, in configuration order
pub fn calibrate_all(
    engine: &dyn StorageEngine,
    config: &HarnessConfig,
) -> Result<Vec<CalibrationReport>> {
    config
        .empirical_offsets
        .iter()
        .map(|empirical| calibrate(engine, config, empirical))
        .collect()
}

fn populate(
    engine: &dyn StorageEngine,
    config: &HarnessConfig,
    ctx: &ScenarioContext,
    keyspace: Keyspace,
    class: ArtifactClass,
) -> Result<()> {
    let options = config.open.with_create_if_missing(true);
    let mut handle = engine.open(ctx.dir(), &options)?;
    for entry in keyspace.iter() {
        handle.put(&entry.key, &entry.value)?;
    }
    if let (ArtifactClass::SortedTable, Some((low, high))) = (class, keyspace.key_bounds()) {
        handle.compact(&low, &high)?;
    }
    handle.close()?;
    Ok(())
}
