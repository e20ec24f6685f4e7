//! Deterministic keyspaces
//!
//! A keyspace is the index range `[lo, hi)` mapped through a fixed naming
//! scheme: index `i` becomes key `key-<i>` with value `value-<i>`. The mapping
//! is pure, so the expected contents of any range can be regenerated after
//! corruption without keeping a separate ground-truth store.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Prefix of every generated key
pub const KEY_PREFIX: &str = "key-";
/// Prefix of every generated value
pub const VALUE_PREFIX: &str = "value-";

/// Immutable index range of generated key/value pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyspace {
    lo: u64,
    hi: u64,
}

/// One generated pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceEntry {
    /// Index the pair was generated from
    pub index: u64,
    /// `key-<index>`
    pub key: Vec<u8>,
    /// `value-<index>`
    pub value: Vec<u8>,
}

impl Keyspace {
    /// Keyspace over `[lo, hi)`; an inverted range is empty
    pub fn new(lo: u64, hi: u64) -> Self {
        Keyspace { lo, hi: hi.max(lo) }
    }

    /// Keyspace over `[0, n)`
    pub fn first(n: u64) -> Self {
        Self::new(0, n)
    }

    /// Key for an index
    pub fn key(index: u64) -> Vec<u8> {
        format!("{KEY_PREFIX}{index}").into_bytes()
    }

    /// Value for an index
    pub fn value(index: u64) -> Vec<u8> {
        format!("{VALUE_PREFIX}{index}").into_bytes()
    }

    /// Parse the index back out of a generated key
    pub fn index_of(key: &[u8]) -> Option<u64> {
        std::str::from_utf8(key)
            .ok()?
            .strip_prefix(KEY_PREFIX)?
            .parse()
            .ok()
    }

    /// Inclusive lower index
    pub fn lo(&self) -> u64 {
        self.lo
    }

    /// Exclusive upper index
    pub fn hi(&self) -> u64 {
        self.hi
    }

    /// Index range
    pub fn range(&self) -> Range<u64> {
        self.lo..self.hi
    }

    /// Number of pairs
    pub fn len(&self) -> u64 {
        self.hi - self.lo
    }

    /// Whether the keyspace has no pairs
    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    /// Whether an index falls inside the keyspace
    pub fn contains(&self, index: u64) -> bool {
        self.range().contains(&index)
    }

    /// The `count` indices directly above this keyspace
    pub fn following(&self, count: u64) -> Keyspace {
        Keyspace::new(self.hi, self.hi.saturating_add(count))
    }

    /// This keyspace with its upper bound raised by `count`
    pub fn extended(&self, count: u64) -> Keyspace {
        Keyspace::new(self.lo, self.hi.saturating_add(count))
    }

    /// Generated pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = KeyspaceEntry> {
        self.range().map(|index| KeyspaceEntry {
            index,
            key: Self::key(index),
            value: Self::value(index),
        })
    }

    /// Lexicographically smallest and largest keys
    ///
    /// Engines order keys bytewise, so `key-10` sorts before `key-2`. The bounds
    /// are what a compaction must cover to touch every key in the keyspace.
    pub fn key_bounds(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        let mut keys = self.iter().map(|entry| entry.key);
        let first = keys.next()?;
        let (min, max) = keys.fold((first.clone(), first), |(min, max), key| {
            if key < min {
                (key, max)
            } else if key > max {
                (min, key)
            } else {
                (min, max)
            }
        });
        Some((min, max))
    }
}
