//! Engine capability
//!
//! This module defines the seam between the harness and a concrete LSM
//! engine. The harness only ever sees these two traits:
//!
//! - **StorageEngine**: a factory that opens (and recovers) a directory
//! - **EngineHandle**: an open engine offering put, get, compact and close
//!
//! # Lifecycle
//!
//! ```text
//!   StorageEngine::open(dir) ──► EngineHandle ──► put / get / compact ──► close
//!          ▲                                                               │
//!          └──────────── artifacts may be corrupted only here ◄────────────┘
//! ```
//!
//! Handles are used on the thread that opened them and are never shared, so
//! only the factory must be `Send + Sync`.

use crate::options::OpenOptions;
use fracture_core::EngineError;
use std::path::Path;

/// Result type for adapter operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Factory for handles over one engine family
///
/// # Contract
///
/// Opening a directory that holds corrupted artifacts must not panic. It
/// either fails with an [`EngineError`] or succeeds and leaves some keys
/// unreadable. Opening is idempotent: two opens separated by a close, with
/// the directory untouched in between, yield the same read outcomes.
pub trait StorageEngine: Send + Sync {
    /// Short engine name used in logs and reports
    fn name(&self) -> &'static str;

    /// Open `dir`, performing whatever recovery the engine does on open
    ///
    /// # Errors
    ///
    /// Returns an `EngineError` with `op == Open` if the engine refuses the
    /// directory.
    fn open(&self, dir: &Path, options: &OpenOptions) -> EngineResult<Box<dyn EngineHandle>>;
}

/// An open engine
pub trait EngineHandle {
    /// Write one key
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Read one key; `Ok(None)` means the engine reports it absent
    fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Compact the inclusive key range `[low, high]`
    fn compact(&mut self, low: &[u8], high: &[u8]) -> EngineResult<()>;

    /// Close the handle
    ///
    /// Close is a durability barrier: when it returns, every buffered write
    /// has reached the engine's files and no file handle remains open, so the
    /// caller may corrupt artifacts.
    fn close(self: Box<Self>) -> EngineResult<()>;
}
