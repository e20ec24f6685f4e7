//! RocksDB adapter over the `rocksdb` crate
//!
//! Tables are written uncompressed with block-based format version 2, the
//! newest layout the structural offset resolver parses.

use crate::family::EngineFamily;
use crate::options::OpenOptions;
use crate::traits::{EngineHandle, EngineResult, StorageEngine};
use fracture_core::EngineError;
use rocksdb::{BlockBasedOptions, DBCompressionType, Options, WriteOptions, DB};
use std::path::Path;
use tracing::debug;

/// Block-based table format version written by the adapter
pub const TABLE_FORMAT_VERSION: i32 = 2;

/// Factory for RocksDB handles
#[derive(Debug, Clone, Copy, Default)]
pub struct RocksDbEngine;

impl StorageEngine for RocksDbEngine {
    fn name(&self) -> &'static str {
        EngineFamily::RocksDb.name()
    }

    fn open(&self, dir: &Path, options: &OpenOptions) -> EngineResult<Box<dyn EngineHandle>> {
        let mut table = BlockBasedOptions::default();
        table.set_format_version(TABLE_FORMAT_VERSION);

        let mut opts = Options::default();
        opts.create_if_missing(options.create_if_missing);
        opts.set_paranoid_checks(options.paranoid_checks);
        opts.set_disable_auto_compactions(options.disable_auto_compactions);
        opts.set_compression_type(DBCompressionType::None);
        opts.set_block_based_table_factory(&table);

        let db = DB::open(&opts, dir).map_err(|e| EngineError::open(e.to_string()))?;
        debug!(
            target: "fracture::engine",
            dir = %dir.display(),
            family = "rocksdb",
            "Opened engine"
        );

        let mut write = WriteOptions::default();
        write.set_sync(options.sync_writes);
        Ok(Box::new(RocksDbHandle { db, write }))
    }
}

/// Open RocksDB database
pub struct RocksDbHandle {
    db: DB,
    write: WriteOptions,
}

impl EngineHandle for RocksDbHandle {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.db
            .put_opt(key, value, &self.write)
            .map_err(|e| EngineError::put(e.to_string()))
    }

    fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| EngineError::get(e.to_string()))
    }

    fn compact(&mut self, low: &[u8], high: &[u8]) -> EngineResult<()> {
        self.db.compact_range(Some(low), Some(high));
        Ok(())
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        self.db
            .flush_wal(true)
            .map_err(|e| EngineError::close(e.to_string()))?;
        drop(self);
        Ok(())
    }
}
