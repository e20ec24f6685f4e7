//! Block-based sorted table layout (LevelDB and RocksDB).
//!
//! # File Layout
//!
//! ```text
//! ┌─────────────────────┬─────────────┐
//! │ Data block 0        │ Trailer (5) │
//! ├─────────────────────┼─────────────┤
//! │ ...                 │             │
//! ├─────────────────────┼─────────────┤
//! │ Metaindex block     │ Trailer (5) │
//! ├─────────────────────┼─────────────┤
//! │ Index block         │ Trailer (5) │
//! ├─────────────────────┴─────────────┤
//! │ Footer (48 legacy / 53 RocksDB)   │
//! └───────────────────────────────────┘
//!
//! Trailer: compression type (1) + checksum (4 LE)
//!
//! Legacy footer:       metaindex handle, index handle, pad to 40, magic (8)
//! Block-based footer:  checksum type (1), handles padded to 40, version (4), magic (8)
//! ```
//!
//! Each index entry maps a separator key (greater than or equal to every key
//! in its data block, smaller than every key in the next) to the handle of
//! that block. Only uncompressed index blocks and block-based format versions
//! whose index entries use the plain block encoding are understood.

use super::{decode_varint32, BlockHandle, LayoutError};
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

/// Magic of LevelDB tables and RocksDB format version 0
pub const LEGACY_TABLE_MAGIC: u64 = 0xdb47_7524_8b80_fb57;

/// Magic of RocksDB block-based tables, format version 1 and later
pub const BLOCK_BASED_TABLE_MAGIC: u64 = 0x88e2_41b7_85f4_cff7;

/// Size of the legacy footer
pub const LEGACY_FOOTER_SIZE: usize = 48;

/// Size of the block-based footer
pub const BLOCK_BASED_FOOTER_SIZE: usize = 53;

/// Compression type byte plus checksum
pub const BLOCK_TRAILER_SIZE: u64 = 5;

/// Highest block-based format version whose index block is plain-encoded
pub const MAX_SUPPORTED_FORMAT_VERSION: u32 = 2;

/// Length of the sequence/type suffix of an internal key
const INTERNAL_KEY_SUFFIX: usize = 8;

/// Parsed table footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Footer start offset
    pub offset: u64,
    /// Block-based format version, 0 for legacy
    pub format_version: u32,
    /// Metaindex block handle
    pub metaindex: BlockHandle,
    /// Index block handle
    pub index: BlockHandle,
}

/// One data block with the separator that bounds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Block handle
    pub handle: BlockHandle,
    /// User-key part of the index separator
    pub separator: Vec<u8>,
}

impl DataBlock {
    /// Bytes of the 4-byte checksum in the block trailer
    pub fn checksum_range(&self) -> Range<u64> {
        let start = self.handle.end().saturating_add(1);
        start..start.saturating_add(4)
    }

    /// Compression byte and checksum
    pub fn trailer_range(&self) -> Range<u64> {
        self.handle.end()..self.handle.end().saturating_add(BLOCK_TRAILER_SIZE)
    }
}

/// Where an offset falls inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRegion {
    /// Contents of a data block
    DataBlock {
        /// Block number
        block: usize,
    },
    /// Trailer of a data block
    DataBlockTrailer {
        /// Block number
        block: usize,
    },
    /// Index block or its trailer
    Index,
    /// Footer
    Footer,
    /// Metaindex, meta blocks or unaccounted space
    Other,
}

/// Parsed footer and data block map of a table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    footer: Footer,
    blocks: Vec<DataBlock>,
    len: u64,
}

impl TableLayout {
    /// Parse footer and index block
    pub fn parse(data: &[u8]) -> Result<Self, LayoutError> {
        let footer = parse_footer(data)?;
        let index = read_block(data, footer.index, "index block", footer.offset)?;

        let mut blocks = Vec::new();
        let mut entries = BlockEntries::new(index, footer.index.offset)?;
        while let Some((key, value)) = entries.try_next()? {
            let (handle, _) = BlockHandle::decode(&value, 0)?;
            if !handle.trailer_end().is_some_and(|end| end <= footer.offset) {
                return Err(LayoutError::OutOfBounds {
                    what: "data block",
                    offset: handle.offset,
                    size: handle.size,
                });
            }
            let user_len = key.len().saturating_sub(INTERNAL_KEY_SUFFIX);
            blocks.push(DataBlock {
                handle,
                separator: key[..user_len].to_vec(),
            });
        }

        Ok(TableLayout {
            footer,
            blocks,
            len: data.len() as u64,
        })
    }

    /// Footer
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Data blocks in file order
    pub fn blocks(&self) -> &[DataBlock] {
        &self.blocks
    }

    /// One data block by number
    pub fn block(&self, block: usize) -> Result<&DataBlock, LayoutError> {
        self.blocks.get(block).ok_or(LayoutError::NoSuchBlock {
            block,
            available: self.blocks.len(),
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

    /// Whether a user key sorts into the given block
    ///
    /// Block `n` holds the keys above separator `n - 1` and up to separator `n`.
    pub fn block_covers(&self, block: usize, key: &[u8]) -> bool {
        let Some(current) = self.blocks.get(block) else {
            return false;
        };
        let above_previous = match block.checked_sub(1) {
            Some(prev) => key > self.blocks[prev].separator.as_slice(),
            None => true,
        };
        above_previous && key <= current.separator.as_slice()
    }

    /// Classify an offset
    pub fn region_of(&self, offset: u64) -> TableRegion {
        if offset >= self.footer.offset {
            return TableRegion::Footer;
        }
        let index = self.footer.index;
        if (index.offset..index.end().saturating_add(BLOCK_TRAILER_SIZE)).contains(&offset) {
            return TableRegion::Index;
        }
        for (block, data_block) in self.blocks.iter().enumerate() {
            if (data_block.handle.offset..data_block.handle.end()).contains(&offset) {
                return TableRegion::DataBlock { block };
            }
            if data_block.trailer_range().contains(&offset) {
                return TableRegion::DataBlockTrailer { block };
            }
        }
        TableRegion::Other
    }
}

fn parse_footer(data: &[u8]) -> Result<Footer, LayoutError> {
    if data.len() < LEGACY_FOOTER_SIZE {
        return Err(LayoutError::Truncated {
            what: "table footer",
            offset: 0,
        });
    }
    let magic = LittleEndian::read_u64(&data[data.len() - 8..]);

    let (offset, format_version, handles_at) = match magic {
        LEGACY_TABLE_MAGIC => {
            let offset = data.len() - LEGACY_FOOTER_SIZE;
            (offset, 0, offset)
        }
        BLOCK_BASED_TABLE_MAGIC => {
            if data.len() < BLOCK_BASED_FOOTER_SIZE {
                return Err(LayoutError::Truncated {
                    what: "table footer",
                    offset: 0,
                });
            }
            let offset = data.len() - BLOCK_BASED_FOOTER_SIZE;
            let version = LittleEndian::read_u32(&data[data.len() - 12..data.len() - 8]);
            if version == 0 || version > MAX_SUPPORTED_FORMAT_VERSION {
                return Err(LayoutError::UnsupportedTableVersion(version));
            }
            // skip the checksum type byte
            (offset, version, offset + 1)
        }
        other => return Err(LayoutError::BadMagic(other)),
    };

    let (metaindex, pos) = BlockHandle::decode(data, handles_at)?;
    let (index, _) = BlockHandle::decode(data, pos)?;
    Ok(Footer {
        offset: offset as u64,
        format_version,
        metaindex,
        index,
    })
}

/// Contents of an uncompressed block that ends before `limit`
fn read_block<'a>(
    data: &'a [u8],
    handle: BlockHandle,
    what: &'static str,
    limit: u64,
) -> Result<&'a [u8], LayoutError> {
    if !handle.trailer_end().is_some_and(|end| end <= limit) {
        return Err(LayoutError::OutOfBounds {
            what,
            offset: handle.offset,
            size: handle.size,
        });
    }
    let compression = data[handle.end() as usize];
    if compression != 0 {
        return Err(LayoutError::CompressedBlock {
            offset: handle.offset,
            compression,
        });
    }
    Ok(&data[handle.offset as usize..handle.end() as usize])
}

/// Cursor over the prefix-compressed entries of a block
struct BlockEntries<'a> {
    block: &'a [u8],
    base: u64,
    pos: usize,
    limit: usize,
    last_key: Vec<u8>,
}

impl<'a> BlockEntries<'a> {
    fn new(block: &'a [u8], base: u64) -> Result<Self, LayoutError> {
        let truncated = LayoutError::Truncated {
            what: "block restart array",
            offset: base,
        };
        if block.len() < 4 {
            return Err(truncated);
        }
        let num_restarts = LittleEndian::read_u32(&block[block.len() - 4..]) as usize;
        let restarts_len = num_restarts
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| truncated.clone())?;
        let limit = block.len().checked_sub(restarts_len).ok_or(truncated)?;
        Ok(BlockEntries {
            block,
            base,
            pos: 0,
            limit,
            last_key: Vec::new(),
        })
    }

    fn try_next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LayoutError> {
        if self.pos >= self.limit {
            return Ok(None);
        }
        let entry_at = self.base + self.pos as u64;
        let (shared, pos) = decode_varint32(self.block, self.pos)?;
        let (non_shared, pos) = decode_varint32(self.block, pos)?;
        let (value_len, pos) = decode_varint32(self.block, pos)?;
        let (shared, non_shared, value_len) =
            (shared as usize, non_shared as usize, value_len as usize);
        let end = pos + non_shared + value_len;
        if shared > self.last_key.len() || end > self.limit {
            return Err(LayoutError::Truncated {
                what: "block entry",
                offset: entry_at,
            });
        }
        let mut key = self.last_key[..shared].to_vec();
        key.extend_from_slice(&self.block[pos..pos + non_shared]);
        let value = self.block[pos + non_shared..end].to_vec();
        self.last_key.clone_from(&key);
        self.pos = end;
        Ok(Some((key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::build_table;
    use super::*;

    fn groups() -> Vec<Vec<&'static str>> {
        vec![
            vec!["key-0", "key-1", "key-10"],
            vec!["key-11", "key-12"],
            vec!["key-2", "key-3", "key-4"],
        ]
    }

    #[test]
    fn test_parse_legacy_table() {
        let data = build_table(&groups(), 0);
        let layout = TableLayout::parse(&data).unwrap();
        assert_eq!(layout.footer().format_version, 0);
        assert_eq!(layout.footer().offset, (data.len() - LEGACY_FOOTER_SIZE) as u64);
        assert_eq!(layout.blocks().len(), 3);
        assert_eq!(layout.blocks()[0].handle.offset, 0);
        assert_eq!(layout.blocks()[1].separator, b"key-12".to_vec());
        assert_eq!(
            layout.blocks()[1].handle.offset,
            layout.blocks()[0].handle.end() + BLOCK_TRAILER_SIZE
        );
    }

    #[test]
    fn test_parse_block_based_table() {
        let data = build_table(&groups(), 2);
        let layout = TableLayout::parse(&data).unwrap();
        assert_eq!(layout.footer().format_version, 2);
        assert_eq!(layout.blocks().len(), 3);
        assert_eq!(layout.blocks()[2].separator, b"key-4".to_vec());
    }

    #[test]
    fn test_unsupported_version() {
        let data = build_table(&groups(), 5);
        assert_eq!(
            TableLayout::parse(&data).unwrap_err(),
            LayoutError::UnsupportedTableVersion(5)
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build_table(&groups(), 0);
        let len = data.len();
        data[len - 1] ^= 0x01;
        assert!(matches!(
            TableLayout::parse(&data).unwrap_err(),
            LayoutError::BadMagic(_)
        ));
    }

    #[test]
    fn test_too_short_for_footer() {
        assert!(matches!(
            TableLayout::parse(&[0u8; 20]).unwrap_err(),
            LayoutError::Truncated { .. }
        ));
    }

    #[test]
    fn test_compressed_index_is_rejected() {
        let mut data = build_table(&groups(), 0);
        let layout = TableLayout::parse(&data).unwrap();
        let index = layout.footer().index;
        data[index.end() as usize] = 1;
        assert!(matches!(
            TableLayout::parse(&data).unwrap_err(),
            LayoutError::CompressedBlock { compression: 1, .. }
        ));
    }

    #[test]
    fn test_block_covers() {
        let data = build_table(&groups(), 0);
        let layout = TableLayout::parse(&data).unwrap();
        assert!(layout.block_covers(0, b"key-0"));
        assert!(layout.block_covers(0, b"key-10"));
        assert!(!layout.block_covers(0, b"key-11"));
        assert!(layout.block_covers(1, b"key-11"));
        assert!(layout.block_covers(2, b"key-3"));
        assert!(!layout.block_covers(2, b"key-5"));
        assert!(!layout.block_covers(3, b"key-0"));
    }

    #[test]
    fn test_region_of() {
        let data = build_table(&groups(), 0);
        let layout = TableLayout::parse(&data).unwrap();
        let block1 = &layout.blocks()[1];
        assert_eq!(
            layout.region_of(block1.handle.offset),
            TableRegion::DataBlock { block: 1 }
        );
        assert_eq!(
            layout.region_of(block1.checksum_range().start),
            TableRegion::DataBlockTrailer { block: 1 }
        );
        assert_eq!(
            layout.region_of(layout.footer().index.offset),
            TableRegion::Index
        );
        assert_eq!(layout.region_of(layout.footer().offset), TableRegion::Footer);
        assert_eq!(
            layout.region_of(layout.footer().metaindex.offset),
            TableRegion::Other
        );
    }

    /// Legacy footer whose index handle starts near `u64::MAX`
    fn footer_with_index_at(offset: u64) -> Vec<u8> {
        let mut footer = vec![0x00, 0x00];
        let mut rest = offset;
        while rest >= 0x80 {
            footer.push((rest as u8 & 0x7F) | 0x80);
            rest >>= 7;
        }
        footer.push(rest as u8);
        footer.push(0x10);
        footer.resize(LEGACY_FOOTER_SIZE - 8, 0);
        footer.extend_from_slice(&LEGACY_TABLE_MAGIC.to_le_bytes());
        footer
    }

    #[test]
    fn test_huge_handle_is_rejected_without_overflow() {
        for offset in [u64::MAX, u64::MAX - 3, u64::MAX - 20] {
            let data = footer_with_index_at(offset);
            assert_eq!(data.len(), LEGACY_FOOTER_SIZE);
            assert!(matches!(
                TableLayout::parse(&data).unwrap_err(),
                LayoutError::OutOfBounds { .. }
            ));
        }
    }

    #[test]
    fn test_handle_past_footer_is_rejected() {
        let data = footer_with_index_at(1 << 40);
        assert!(matches!(
            TableLayout::parse(&data).unwrap_err(),
            LayoutError::OutOfBounds {
                what: "index block",
                ..
            }
        ));
    }

    #[test]
    fn test_saturating_ranges() {
        let block = DataBlock {
            handle: BlockHandle {
                offset: u64::MAX - 2,
                size: 1,
            },
            separator: Vec::new(),
        };
        assert_eq!(block.handle.end(), u64::MAX - 1);
        assert_eq!(block.trailer_range().end, u64::MAX);
        assert_eq!(block.checksum_range(), u64::MAX..u64::MAX);
        assert_eq!(block.handle.trailer_end(), None);
    }
}
