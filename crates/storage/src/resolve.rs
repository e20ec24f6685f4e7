//! Structural offset resolution
//!
//! Turns a [`StructuralTarget`] into a concrete byte offset by parsing the
//! artifact, and maps any offset back to the region it lands in. Parsed
//! boundaries survive engine upgrades that shift the layout; magic offsets do
//! not.

use crate::format::{LayoutError, TableLayout, TableRegion, WalLayout, WalRegion};
use fracture_core::{ArtifactClass, StructuralTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Region an offset falls in, with the record or block it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Inside a write-ahead log
    Wal(WalRegion),
    /// Inside a sorted table
    Table(TableRegion),
}

/// Region without record or block numbers, for documenting magic offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Header (checksum, length, type) of a log record
    WalRecordHeader,
    /// Payload of a log record
    WalRecordPayload,
    /// Trailer padding or unparsed log tail
    WalUnused,
    /// Contents of a table data block
    TableDataBlock,
    /// Compression byte or checksum after a data block
    TableBlockTrailer,
    /// Table index block
    TableIndex,
    /// Table footer
    TableFooter,
    /// Metaindex, meta blocks or unaccounted table space
    TableOther,
}

impl Region {
    /// Region kind without numbering
    pub fn kind(&self) -> RegionKind {
        match self {
            Region::Wal(WalRegion::RecordHeader { .. }) => RegionKind::WalRecordHeader,
            Region::Wal(WalRegion::RecordPayload { .. }) => RegionKind::WalRecordPayload,
            Region::Wal(WalRegion::Unused) => RegionKind::WalUnused,
            Region::Table(TableRegion::DataBlock { .. }) => RegionKind::TableDataBlock,
            Region::Table(TableRegion::DataBlockTrailer { .. }) => RegionKind::TableBlockTrailer,
            Region::Table(TableRegion::Index) => RegionKind::TableIndex,
            Region::Table(TableRegion::Footer) => RegionKind::TableFooter,
            Region::Table(TableRegion::Other) => RegionKind::TableOther,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Wal(WalRegion::RecordHeader { record }) => {
                write!(f, "header of log record {record}")
            }
            Region::Wal(WalRegion::RecordPayload { record }) => {
                write!(f, "payload of log record {record}")
            }
            Region::Wal(WalRegion::Unused) => f.write_str("unused log space"),
            Region::Table(TableRegion::DataBlock { block }) => {
                write!(f, "contents of data block {block}")
            }
            Region::Table(TableRegion::DataBlockTrailer { block }) => {
                write!(f, "trailer of data block {block}")
            }
            Region::Table(TableRegion::Index) => f.write_str("index block"),
            Region::Table(TableRegion::Footer) => f.write_str("table footer"),
            Region::Table(TableRegion::Other) => f.write_str("other table space"),
        }
    }
}

/// Offset of the structural target inside `data`
///
/// Within the target's checksum field the first byte that differs from
/// `avoid` is chosen, so an overwrite with that byte always changes the file.
pub fn resolve_structural(
    data: &[u8],
    target: StructuralTarget,
    avoid: Option<u8>,
) -> Result<u64, LayoutError> {
    let candidates = match target {
        StructuralTarget::WalRecordHeader { record } => {
            WalLayout::parse(data)?.record(record)?.checksum_range()
        }
        StructuralTarget::TableBlockChecksum { block } => {
            TableLayout::parse(data)?.block(block)?.checksum_range()
        }
    };
    Ok(pick(data, candidates, avoid))
}

fn pick(data: &[u8], candidates: Range<u64>, avoid: Option<u8>) -> u64 {
    candidates
        .clone()
        .find(|&offset| data.get(offset as usize).copied() != avoid)
        .unwrap_or(candidates.start)
}

/// Region of `offset` inside an artifact of the given class
pub fn classify_offset(
    data: &[u8],
    class: ArtifactClass,
    offset: u64,
) -> Result<Region, LayoutError> {
    match class {
        ArtifactClass::WalSegment => Ok(Region::Wal(WalLayout::parse(data)?.region_of(offset))),
        ArtifactClass::SortedTable => {
            Ok(Region::Table(TableLayout::parse(data)?.region_of(offset)))
        }
    }
}
