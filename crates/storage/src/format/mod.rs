//! Read-only introspection of LSM on-disk formats.
//!
//! Both supported engine families persist their write-ahead log in the
//! LevelDB log format and their sorted tables in the LevelDB block-based table
//! format (RocksDB extends the footer but keeps block handles and trailers).
//! Parsing just enough of each lets the injector aim at a record header or a
//! block checksum instead of trusting a magic offset.
//!
//! # Module Structure
//!
//! - `log`: 32 KiB blocks of checksummed physical records
//! - `table`: footer, index block and data block handles

pub mod log;
pub mod table;

pub use log::{LogRecordHeader, RecordKind, WalLayout, WalRegion};
pub use table::{DataBlock, Footer, TableLayout, TableRegion};

use thiserror::Error;

/// Errors raised while parsing an on-disk layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The data ended before a structure was complete
    #[error("truncated {what} at offset {offset}")]
    Truncated {
        /// Structure being read
        what: &'static str,
        /// Offset it started at
        offset: u64,
    },

    /// Table footer magic is not a known block-based table magic
    #[error("unknown table magic {0:#018x}")]
    BadMagic(u64),

    /// Block-based table format version the parser does not understand
    #[error("unsupported table format version {0}")]
    UnsupportedTableVersion(u32),

    /// A block the parser must read is compressed
    #[error("block at offset {offset} is compressed (type {compression})")]
    CompressedBlock {
        /// Block offset
        offset: u64,
        /// Compression type byte from the trailer
        compression: u8,
    },

    /// A varint ran past its maximum width or the end of the data
    #[error("malformed varint at offset {offset}")]
    BadVarint {
        /// Offset of the varint
        offset: u64,
    },

    /// A structure references bytes outside the file
    #[error("{what} [{offset}, +{size}) lies outside the file")]
    OutOfBounds {
        /// Structure being read
        what: &'static str,
        /// Start offset
        offset: u64,
        /// Size in bytes
        size: u64,
    },

    /// The requested WAL record does not exist
    #[error("record {record} requested but only {available} present")]
    NoSuchRecord {
        /// Requested record
        record: usize,
        /// Records parsed
        available: usize,
    },

    /// The requested data block does not exist
    #[error("block {block} requested but only {available} present")]
    NoSuchBlock {
        /// Requested block
        block: usize,
        /// Data blocks parsed
        available: usize,
    },
}

impl From<LayoutError> for fracture_core::Error {
    fn from(e: LayoutError) -> Self {
        fracture_core::Error::Layout(e.to_string())
    }
}

/// Location of a block inside a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    /// Offset of the block contents
    pub offset: u64,
    /// Size of the block contents, excluding the trailer
    pub size: u64,
}

impl BlockHandle {
    /// Decode a handle (two varints) starting at `pos`; returns the position after it
    pub fn decode(data: &[u8], pos: usize) -> Result<(BlockHandle, usize), LayoutError> {
        let (offset, pos) = decode_varint64(data, pos)?;
        let (size, pos) = decode_varint64(data, pos)?;
        let handle = BlockHandle { offset, size };
        if handle.trailer_end().is_none() {
            return Err(LayoutError::OutOfBounds {
                what: "block handle",
                offset,
                size,
            });
        }
        Ok((handle, pos))
    }

    /// End of the block contents (start of the trailer)
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// End of the block trailer, `None` if it does not fit in a `u64`
    pub fn trailer_end(&self) -> Option<u64> {
        self.offset
            .checked_add(self.size)?
            .checked_add(table::BLOCK_TRAILER_SIZE)
    }
}

/// Decode a LEB128 varint of at most 64 bits starting at `pos`
pub fn decode_varint64(data: &[u8], pos: usize) -> Result<(u64, usize), LayoutError> {
    let mut result = 0u64;
    for (i, shift) in (0..64).step_by(7).enumerate() {
        let byte = *data.get(pos + i).ok_or(LayoutError::BadVarint { offset: pos as u64 })?;
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, pos + i + 1));
        }
    }
    Err(LayoutError::BadVarint { offset: pos as u64 })
}

/// Decode a varint that must fit in 32 bits
pub fn decode_varint32(data: &[u8], pos: usize) -> Result<(u32, usize), LayoutError> {
    let (value, next) = decode_varint64(data, pos)?;
    let value = u32::try_from(value).map_err(|_| LayoutError::BadVarint { offset: pos as u64 })?;
    Ok((value, next))
}
