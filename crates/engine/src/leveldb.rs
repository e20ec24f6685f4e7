//! LevelDB adapter over `rusty-leveldb`
//!
//! Writes go through a single-entry batch so `sync_writes` maps onto the
//! engine's per-write sync flag. Reads go through a snapshot so read failures
//! (a block checksum mismatch, a missing table) surface as errors instead of
//! being folded into "not found".
//!
//! rusty-leveldb has no switch for background compaction, so
//! `disable_auto_compactions` is ignored.

use crate::family::EngineFamily;
use crate::options::OpenOptions;
use crate::traits::{EngineHandle, EngineResult, StorageEngine};
use fracture_core::EngineError;
use rusty_leveldb::{Options, WriteBatch, DB};
use std::path::Path;
use tracing::debug;

/// Factory for LevelDB handles
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelDbEngine;

impl StorageEngine for LevelDbEngine {
    fn name(&self) -> &'static str {
        EngineFamily::LevelDb.name()
    }

    fn open(&self, dir: &Path, options: &OpenOptions) -> EngineResult<Box<dyn EngineHandle>> {
        let mut opts = Options::default();
        opts.create_if_missing = options.create_if_missing;
        opts.paranoid_checks = options.paranoid_checks;

        let db = DB::open(dir, opts).map_err(|e| EngineError::open(e.to_string()))?;
        debug!(
            target: "fracture::engine",
            dir = %dir.display(),
            family = "leveldb",
            "Opened engine"
        );
        Ok(Box::new(LevelDbHandle {
            db,
            sync: options.sync_writes,
        }))
    }
}

/// Open LevelDB database
pub struct LevelDbHandle {
    db: DB,
    sync: bool,
}

impl EngineHandle for LevelDbHandle {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        let mut batch = WriteBatch::default();
        batch.put(key, value);
        self.db
            .write(batch, self.sync)
            .map_err(|e| EngineError::put(e.to_string()))
    }

    fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let snapshot = self.db.get_snapshot();
        self.db
            .get_at(&snapshot, key)
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| EngineError::get(e.to_string()))
    }

    fn compact(&mut self, low: &[u8], high: &[u8]) -> EngineResult<()> {
        self.db
            .compact_range(low, high)
            .map_err(|e| EngineError::compact(e.to_string()))
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.db
            .close()
            .map_err(|e| EngineError::close(e.to_string()))
    }
}
