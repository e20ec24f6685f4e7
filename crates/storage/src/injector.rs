//! Corruption injection
//!
//! Applies a [`CorruptionSpec`] to one artifact in place. The engine must be
//! fully closed: the file is read whole, mutated in memory and written back
//! with a sync before returning.
//!
//! The returned [`CorruptionRecord`] carries the resolved offset. Fixed
//! offsets are engine-version and layout dependent, so the record is what
//! lets a failure be reproduced or a stale constant be re-derived.

use crate::resolve::resolve_structural;
use fracture_core::{
    Artifact, CorruptionOperator, CorruptionRecord, CorruptionSpec, Error, OffsetPolicy,
    OffsetSource, Result,
};
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Corrupt `artifact` according to `spec`
///
/// `rng` is only consulted for [`OffsetPolicy::Random`]; pass the scenario's
/// seeded source so the offset is reproducible.
///
/// # Errors
///
/// - `EmptyArtifact` if the file has zero length
/// - `OffsetOutOfRange` if a fixed (or fallback) offset is past the end
/// - `Layout` if a structural target cannot be resolved and no fallback is set
/// - `Filesystem` on read or write failure
pub fn corrupt<R: Rng + ?Sized>(
    artifact: &Artifact,
    spec: &CorruptionSpec,
    rng: &mut R,
) -> Result<CorruptionRecord> {
    let path = artifact.path.as_path();
    let mut data = fs::read(path).map_err(|e| Error::filesystem(path, e))?;
    if data.is_empty() {
        return Err(Error::EmptyArtifact(path.to_path_buf()));
    }
    let len = data.len() as u64;

    let (offset, source) = resolve_offset(path, &data, spec, rng)?;
    let previous = data[offset as usize];

    let changed = match spec.operator {
        CorruptionOperator::Overwrite { byte } => {
            data[offset as usize] = byte;
            if previous == byte {
                warn!(
                    target: "fracture::inject",
                    path = %path.display(),
                    offset,
                    byte,
                    "Overwrite leaves the file unchanged"
                );
            }
            write_back(path, &data)?;
            previous != byte
        }
        CorruptionOperator::Truncate => {
            truncate(path, offset)?;
            true
        }
    };

    info!(
        target: "fracture::inject",
        path = %path.display(),
        class = %artifact.class,
        offset,
        ?source,
        operator = ?spec.operator,
        original_len = len,
        previous,
        "Corrupted artifact"
    );

    Ok(CorruptionRecord {
        artifact: artifact.clone(),
        offset,
        source,
        operator: spec.operator,
        original_len: len,
        previous,
        changed,
    })
}

fn resolve_offset<R: Rng + ?Sized>(
    path: &Path,
    data: &[u8],
    spec: &CorruptionSpec,
    rng: &mut R,
) -> Result<(u64, OffsetSource)> {
    let len = data.len() as u64;
    let in_range = |offset: u64| -> Result<u64> {
        if offset < len {
            Ok(offset)
        } else {
            Err(Error::OffsetOutOfRange {
                path: path.to_path_buf(),
                offset,
                len,
            })
        }
    };

    match spec.offset {
        OffsetPolicy::Fixed { offset } => Ok((in_range(offset)?, OffsetSource::Fixed)),
        OffsetPolicy::Random => Ok((rng.gen_range(0..len), OffsetSource::Random)),
        OffsetPolicy::Structural { target, fallback } => {
            let avoid = match spec.operator {
                CorruptionOperator::Overwrite { byte } => Some(byte),
                CorruptionOperator::Truncate => None,
            };
            match resolve_structural(data, target, avoid) {
                Ok(offset) => Ok((in_range(offset)?, OffsetSource::Structural)),
                Err(e) => match fallback {
                    Some(offset) => {
                        warn!(
                            target: "fracture::inject",
                            path = %path.display(),
                            error = %e,
                            fallback = offset,
                            "Structural resolution failed, using empirical offset"
                        );
                        Ok((in_range(offset)?, OffsetSource::EmpiricalFallback))
                    }
                    None => Err(e.into()),
                },
            }
        }
    }
}

fn write_back(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::filesystem(path, e))?;
    file.write_all(data).map_err(|e| Error::filesystem(path, e))?;
    file.sync_all().map_err(|e| Error::filesystem(path, e))
}

fn truncate(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::filesystem(path, e))?;
    file.set_len(len).map_err(|e| Error::filesystem(path, e))?;
    file.sync_all().map_err(|e| Error::filesystem(path, e))
}
