//! LevelDB-family write-ahead log layout.
//!
//! # File Layout
//!
//! ```text
//! ┌──────────────────────────── 32 KiB block ────────────────────────────┐
//! │ Record │ Record │ ... │ Record │ trailer (< 7 zero bytes, optional)  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Record Layout
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────┬──────────────────┬─────────────────────┐
//! │ CRC32C (4)   │ Length (2 LE)│ Type (1) │ Log number (4)*  │ Payload (Length)    │
//! └──────────────┴──────────────┴──────────┴──────────────────┴─────────────────────┘
//! * recyclable record types only (RocksDB)
//! ```
//!
//! A damaged checksum or length makes replay drop the record (and, for
//! LevelDB, the rest of its block), which is what the harness relies on to
//! produce a truncation-style failure.

use super::LayoutError;
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

/// Size of a log block
pub const LOG_BLOCK_SIZE: usize = 32 * 1024;

/// Size of a legacy record header
pub const LOG_HEADER_SIZE: usize = 7;

/// Size of a recyclable record header
pub const RECYCLABLE_HEADER_SIZE: usize = 11;

/// Record type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Preallocated or padding space
    Zero,
    /// Complete logical record
    Full,
    /// First fragment of a logical record
    First,
    /// Middle fragment
    Middle,
    /// Last fragment
    Last,
    /// Recyclable variant of one of the above (RocksDB `kRecyclable*Type`)
    Recyclable(u8),
    /// Metadata record (RocksDB compression / timestamp-size records)
    Meta(u8),
}

impl RecordKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RecordKind::Zero),
            1 => Some(RecordKind::Full),
            2 => Some(RecordKind::First),
            3 => Some(RecordKind::Middle),
            4 => Some(RecordKind::Last),
            5..=8 | 11 => Some(RecordKind::Recyclable(byte)),
            9 | 10 => Some(RecordKind::Meta(byte)),
            _ => None,
        }
    }

    /// Header size implied by the type
    pub fn header_len(&self) -> usize {
        match self {
            RecordKind::Recyclable(_) => RECYCLABLE_HEADER_SIZE,
            _ => LOG_HEADER_SIZE,
        }
    }
}

/// Header of one physical record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecordHeader {
    /// Offset of the header's first byte
    pub offset: u64,
    /// Payload length
    pub length: u16,
    /// Record type
    pub kind: RecordKind,
}

impl LogRecordHeader {
    /// Bytes of the CRC32C field
    pub fn checksum_range(&self) -> Range<u64> {
        self.offset..self.offset + 4
    }

    /// Bytes of the length field
    pub fn length_range(&self) -> Range<u64> {
        self.offset + 4..self.offset + 6
    }

    /// All header bytes
    pub fn header_range(&self) -> Range<u64> {
        self.offset..self.offset + self.kind.header_len() as u64
    }

    /// Payload bytes
    pub fn payload_range(&self) -> Range<u64> {
        let start = self.header_range().end;
        start..start + u64::from(self.length)
    }
}

/// Where an offset falls inside a log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalRegion {
    /// Inside the header of a record
    RecordHeader {
        /// Record number
        record: usize,
    },
    /// Inside the payload of a record
    RecordPayload {
        /// Record number
        record: usize,
    },
    /// Block trailer padding or space after the last parsed record
    Unused,
}

/// Parsed physical record headers of a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalLayout {
    records: Vec<LogRecordHeader>,
    len: u64,
    /// Offset where parsing stopped early (torn tail, unknown type), if it did
    stopped_at: Option<u64>,
}

impl WalLayout {
    /// Enumerate physical records block by block
    ///
    /// Parsing stops, without failing, at preallocated zero space, at an
    /// unknown record type and at a record that overruns its block: all three
    /// are how a log tail legitimately looks after a crash.
    pub fn parse(data: &[u8]) -> Result<Self, LayoutError> {
        let mut records = Vec::new();
        let mut stopped_at = None;
        let mut block_start = 0usize;

        'blocks: while block_start < data.len() {
            let block_end = (block_start + LOG_BLOCK_SIZE).min(data.len());
            let mut pos = block_start;

            while block_end - pos >= LOG_HEADER_SIZE {
                let length = LittleEndian::read_u16(&data[pos + 4..pos + 6]);
                let Some(kind) = RecordKind::from_byte(data[pos + 6]) else {
                    stopped_at = Some(pos as u64);
                    break 'blocks;
                };
                if kind == RecordKind::Zero && length == 0 {
                    stopped_at = Some(pos as u64);
                    break 'blocks;
                }
                let end = pos + kind.header_len() + usize::from(length);
                if end > block_end {
                    stopped_at = Some(pos as u64);
                    break 'blocks;
                }
                records.push(LogRecordHeader {
                    offset: pos as u64,
                    length,
                    kind,
                });
                pos = end;
            }
            block_start += LOG_BLOCK_SIZE;
        }

        Ok(WalLayout {
            records,
            len: data.len() as u64,
            stopped_at,
        })
    }

    /// Physical records in file order
    pub fn records(&self) -> &[LogRecordHeader] {
        &self.records
    }

    /// One record by number
    pub fn record(&self, record: usize) -> Result<&LogRecordHeader, LayoutError> {
        self.records.get(record).ok_or(LayoutError::NoSuchRecord {
            record,
            available: self.records.len(),
        })
    }

    /// File length
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset where parsing stopped before the end of the file
    pub fn stopped_at(&self) -> Option<u64> {
        self.stopped_at
    }

    /// Classify an offset
    pub fn region_of(&self, offset: u64) -> WalRegion {
        let idx = self.records.partition_point(|r| r.offset <= offset);
        if idx == 0 {
            return WalRegion::Unused;
        }
        let record = idx - 1;
        let header = &self.records[record];
        if header.header_range().contains(&offset) {
            WalRegion::RecordHeader { record }
        } else if header.payload_range().contains(&offset) {
            WalRegion::RecordPayload { record }
        } else {
            WalRegion::Unused
        }
    }
}
