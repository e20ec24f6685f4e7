//! Artifact location
//!
//! Walks a storage directory once, in sorted depth-first order, and returns
//! the first file whose extension matches the requested class. Engines may
//! leave several candidates behind (older log generations, several tables);
//! callers that care which one is corrupted must arrange for exactly one to
//! exist before the first close.

use fracture_core::{Artifact, ArtifactClass, Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locates artifacts under one storage directory
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    /// Storage directory
    dir: PathBuf,
}

impl ArtifactLocator {
    /// Create a locator for a storage directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        ArtifactLocator {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First artifact of the class, stopping the walk at the first match
    pub fn locate(&self, class: ArtifactClass) -> Result<Artifact> {
        locate(&self.dir, class)
    }

    /// Every artifact of the class, in walk order
    pub fn locate_all(&self, class: ArtifactClass) -> Result<Vec<Artifact>> {
        locate_all(&self.dir, class)
    }
}

/// First file of `class` under `dir`
///
/// Fails with `ArtifactNotFound` after a full walk without a match, and with
/// `Filesystem` if the walk itself fails.
pub fn locate(dir: &Path, class: ArtifactClass) -> Result<Artifact> {
    let mut found = None;
    walk(dir, &mut |path: &Path| {
        if class.matches(path) {
            found = Some(path.to_path_buf());
            false
        } else {
            true
        }
    })?;

    match found {
        Some(path) => {
            debug!(target: "fracture::locator", path = %path.display(), %class, "Located artifact");
            Ok(Artifact::new(path, class))
        }
        None => Err(Error::ArtifactNotFound {
            dir: dir.to_path_buf(),
            class,
        }),
    }
}

/// Every file of `class` under `dir`, in the same order `locate` visits them
pub fn locate_all(dir: &Path, class: ArtifactClass) -> Result<Vec<Artifact>> {
    let mut found = Vec::new();
    walk(dir, &mut |path: &Path| {
        if class.matches(path) {
            found.push(Artifact::new(path, class));
        }
        true
    })?;
    Ok(found)
}

/// Depth-first walk in sorted path order; `visit` returns false to stop
fn walk(dir: &Path, visit: &mut dyn FnMut(&Path) -> bool) -> Result<bool> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()
        })
        .map_err(|e| Error::filesystem(dir, e))?;
    entries.sort();

    for path in entries {
        let file_type = fs::symlink_metadata(&path)
            .map_err(|e| Error::filesystem(&path, e))?
            .file_type();
        if file_type.is_dir() {
            if !walk(&path, visit)? {
                return Ok(false);
            }
        } else if file_type.is_file() && !visit(&path) {
            return Ok(false);
        }
    }
    Ok(true)
}
