//! Per-scenario context
//!
//! A scenario owns its storage directory, its random source and its
//! keyspace. Nothing is shared between scenarios, so two scenarios with the
//! same seed and keyspace corrupt the same offsets.

use fracture_core::{Error, Keyspace, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory, random source and keyspace of one scenario run
#[derive(Debug)]
pub struct ScenarioContext {
    dir: TempDir,
    rng: StdRng,
    seed: u64,
    keyspace: Keyspace,
}

impl ScenarioContext {
    /// Fresh context in the system temp directory
    pub fn new(seed: u64, keyspace: Keyspace) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("fracture-")
            .tempdir()
            .map_err(|e| Error::filesystem(std::env::temp_dir(), e))?;
        Ok(Self::with_dir(dir, seed, keyspace))
    }

    /// Fresh context in a directory created under `parent`
    pub fn new_in(parent: &Path, seed: u64, keyspace: Keyspace) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("fracture-")
            .tempdir_in(parent)
            .map_err(|e| Error::filesystem(parent, e))?;
        Ok(Self::with_dir(dir, seed, keyspace))
    }

    fn with_dir(dir: TempDir, seed: u64, keyspace: Keyspace) -> Self {
        ScenarioContext {
            dir,
            rng: StdRng::seed_from_u64(seed),
            seed,
            keyspace,
        }
    }

    /// Storage directory handed to the engine
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Seeded random source
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Seed the random source started from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Keyspace written before corruption
    pub fn keyspace(&self) -> Keyspace {
        self.keyspace
    }

    /// Keep the storage directory on disk, e.g. to inspect a failure
    pub fn persist(self) -> PathBuf {
        self.dir.into_path()
    }
}
