//! Test doubles for the harness
//!
//! - **JournalEngine**: a tiny checksum-framed engine that persists a `.log`
//!   journal and `.sst` tables, so scenarios can run end to end without a real
//!   LSM engine and with fully predictable recovery behaviour
//! - **FaultyHandle**: an in-memory handle whose answers are scripted per key
//!
//! # Frame Layout
//!
//! Journals and tables are both sequences of frames:
//!
//! ```text
//! ┌──────────────┬─────────────┬──────────────┬──────────┬────────────┐
//! │ Length (4 LE)│ CRC32 (4 LE)│ Key len (2)  │ Key      │ Value      │
//! └──────────────┴─────────────┴──────────────┴──────────┴────────────┘
//! Length counts everything after the CRC; the CRC covers the same bytes.
//! ```
//!
//! # Recovery Behaviour
//!
//! - Journal replay stops at the first damaged or torn frame, dropping the
//!   suffix (or refusing to open when `paranoid`)
//! - A table frame with a bad CRC stays in place and reads of its key fail
//! - A damaged table length field loses every later frame of that table
//! - On open a non-empty journal is flushed to a new table and deleted
//! - `unverified()` skips CRC checks, so damaged bytes are served as data

use byteorder::{ByteOrder, LittleEndian};
use fracture_core::{EngineError, Keyspace};
use fracture_engine::{EngineHandle, EngineResult, OpenOptions, StorageEngine};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Bytes before the key in every frame
pub const FRAME_HEADER_SIZE: usize = 10;

const JOURNAL_EXT: &str = "log";
const TABLE_EXT: &str = "sst";

/// Encode one frame
pub fn encode_frame(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + key.len() + value.len());
    body.extend_from_slice(&(key.len() as u16).to_le_bytes());
    body.extend_from_slice(key);
    body.extend_from_slice(value);

    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Size of the frame holding `key` and `value`
pub fn frame_len(key: &[u8], value: &[u8]) -> usize {
    FRAME_HEADER_SIZE + key.len() + value.len()
}

/// Offset of the frame for keyspace index `index` in a table holding `keyspace`
///
/// Tables are written in key order, so this is not `index * frame size`.
pub fn table_frame_offset(keyspace: Keyspace, index: u64) -> Option<u64> {
    let mut entries: Vec<_> = keyspace.iter().collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    let mut offset = 0u64;
    for entry in entries {
        if entry.index == index {
            return Some(offset);
        }
        offset += frame_len(&entry.key, &entry.value) as u64;
    }
    None
}

#[derive(Debug)]
struct Frame {
    key: Vec<u8>,
    value: Vec<u8>,
    intact: bool,
}

/// Frames of a file, plus the offset where decoding stopped early
fn decode_frames(data: &[u8], verify: bool) -> (Vec<Frame>, Option<usize>) {
    let mut frames = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if data.len() - pos < 8 {
            return (frames, Some(pos));
        }
        let len = LittleEndian::read_u32(&data[pos..pos + 4]) as usize;
        let crc = LittleEndian::read_u32(&data[pos + 4..pos + 8]);
        let end = match (pos + 8).checked_add(len) {
            Some(end) if len >= 2 && end <= data.len() => end,
            _ => return (frames, Some(pos)),
        };
        let body = &data[pos + 8..end];
        let key_len = usize::from(LittleEndian::read_u16(&body[0..2]));
        if 2 + key_len > body.len() {
            return (frames, Some(pos));
        }
        frames.push(Frame {
            key: body[2..2 + key_len].to_vec(),
            value: body[2 + key_len..].to_vec(),
            intact: !verify || crc32fast::hash(body) == crc,
        });
        pos = end;
    }
    (frames, None)
}

fn numbered_files(dir: &Path, ext: &str) -> std::io::Result<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == ext) {
            let number = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(number) = number {
                files.push((number, path));
            }
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(dir: &Path, number: u64, ext: &str) -> PathBuf {
    dir.join(format!("{number:06}.{ext}"))
}

fn write_table(path: &Path, entries: &BTreeMap<Vec<u8>, Slot>) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for (key, slot) in entries {
        if let Slot::Value(value) = slot {
            file.write_all(&encode_frame(key, value))?;
        }
    }
    file.sync_all()
}

#[derive(Debug, Clone)]
enum Slot {
    Value(Vec<u8>),
    Damaged,
}

/// Checksum-framed engine double
#[derive(Debug, Clone, Default)]
pub struct JournalEngine {
    unverified: bool,
    paranoid: bool,
    hang_on_open: Option<Duration>,
    panic_on_open: bool,
    fail_close: bool,
}

impl JournalEngine {
    /// Engine that verifies every checksum and fails closed
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip checksum verification, serving damaged bytes as data
    pub fn unverified(mut self) -> Self {
        self.unverified = true;
        self
    }

    /// Refuse to open when the journal is damaged
    pub fn paranoid(mut self) -> Self {
        self.paranoid = true;
        self
    }

    /// Sleep for `delay` at the start of every open
    pub fn hanging(mut self, delay: Duration) -> Self {
        self.hang_on_open = Some(delay);
        self
    }

    /// Panic at the start of every open
    pub fn panicking(mut self) -> Self {
        self.panic_on_open = true;
        self
    }

    /// Report a close failure after the journal is synced
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn recover(&self, dir: &Path) -> std::io::Result<Result<Recovered, String>> {
        let verify = !self.unverified;
        let mut entries = BTreeMap::new();
        let mut next_number = 1;

        for (number, path) in numbered_files(dir, TABLE_EXT)? {
            next_number = next_number.max(number + 1);
            let (frames, stopped) = decode_frames(&fs::read(&path)?, verify);
            if let Some(at) = stopped {
                debug!(
                    target: "fracture::testing",
                    path = %path.display(),
                    at,
                    "Table frames lost"
                );
            }
            for frame in frames {
                let slot = if frame.intact {
                    Slot::Value(frame.value)
                } else {
                    Slot::Damaged
                };
                entries.insert(frame.key, slot);
            }
        }

        let journals = numbered_files(dir, JOURNAL_EXT)?;
        let mut replayed = BTreeMap::new();
        for (number, path) in &journals {
            next_number = next_number.max(number + 1);
            let (frames, stopped) = decode_frames(&fs::read(path)?, verify);
            let damaged = frames.iter().position(|f| !f.intact);
            if self.paranoid && (stopped.is_some() || damaged.is_some()) {
                return Ok(Err(format!("journal {} is damaged", path.display())));
            }
            let keep = damaged.unwrap_or(frames.len());
            for frame in frames.into_iter().take(keep) {
                replayed.insert(frame.key, Slot::Value(frame.value));
            }
        }

        if !replayed.is_empty() {
            let table = file_name(dir, next_number, TABLE_EXT);
            next_number += 1;
            write_table(&table, &replayed)?;
            entries.extend(replayed);
        }
        for (_, path) in journals {
            fs::remove_file(path)?;
        }

        Ok(Ok(Recovered {
            entries,
            next_number,
        }))
    }
}

struct Recovered {
    entries: BTreeMap<Vec<u8>, Slot>,
    next_number: u64,
}

impl StorageEngine for JournalEngine {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn open(&self, dir: &Path, options: &OpenOptions) -> EngineResult<Box<dyn EngineHandle>> {
        if self.panic_on_open {
            panic!("journal engine asked to panic on open");
        }
        if let Some(delay) = self.hang_on_open {
            thread::sleep(delay);
        }
        if !dir.is_dir() {
            if !options.create_if_missing {
                return Err(EngineError::open(format!(
                    "{} does not exist",
                    dir.display()
                )));
            }
            fs::create_dir_all(dir).map_err(|e| EngineError::open(e.to_string()))?;
        }

        let recovered = self
            .recover(dir)
            .map_err(|e| EngineError::open(e.to_string()))?
            .map_err(EngineError::open)?;

        Ok(Box::new(JournalHandle {
            dir: dir.to_path_buf(),
            entries: recovered.entries,
            next_number: recovered.next_number,
            journal: None,
            sync: options.sync_writes,
            fail_close: self.fail_close,
        }))
    }
}

/// Open [`JournalEngine`] directory
pub struct JournalHandle {
    dir: PathBuf,
    entries: BTreeMap<Vec<u8>, Slot>,
    next_number: u64,
    journal: Option<(u64, File)>,
    sync: bool,
    fail_close: bool,
}

impl JournalHandle {
    fn journal(&mut self) -> std::io::Result<&mut File> {
        if self.journal.is_none() {
            let number = self.next_number;
            self.next_number += 1;
            let file = File::create(file_name(&self.dir, number, JOURNAL_EXT))?;
            self.journal = Some((number, file));
        }
        match self.journal.as_mut() {
            Some((_, file)) => Ok(file),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "journal not open",
            )),
        }
    }
}

impl EngineHandle for JournalHandle {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        let sync = self.sync;
        let file = self.journal().map_err(|e| EngineError::put(e.to_string()))?;
        file.write_all(&encode_frame(key, value))
            .and_then(|_| if sync { file.sync_data() } else { Ok(()) })
            .map_err(|e| EngineError::put(e.to_string()))?;
        self.entries
            .insert(key.to_vec(), Slot::Value(value.to_vec()));
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        match self.entries.get(key) {
            Some(Slot::Value(value)) => Ok(Some(value.clone())),
            Some(Slot::Damaged) => Err(EngineError::get("table frame checksum mismatch")),
            None => Ok(None),
        }
    }

    /// Rewrites every readable entry into one table; damaged entries are dropped
    fn compact(&mut self, _low: &[u8], _high: &[u8]) -> EngineResult<()> {
        let io = |e: std::io::Error| EngineError::compact(e.to_string());
        let old_tables = numbered_files(&self.dir, TABLE_EXT).map_err(io)?;

        let number = self.next_number;
        self.next_number += 1;
        write_table(&file_name(&self.dir, number, TABLE_EXT), &self.entries).map_err(io)?;

        for (_, path) in old_tables {
            fs::remove_file(path).map_err(io)?;
        }
        if let Some((journal, _)) = self.journal.take() {
            fs::remove_file(file_name(&self.dir, journal, JOURNAL_EXT)).map_err(io)?;
        }
        self.entries.retain(|_, slot| matches!(slot, Slot::Value(_)));
        Ok(())
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        if let Some((_, file)) = self.journal.as_mut() {
            file.flush()
                .and_then(|_| file.sync_all())
                .map_err(|e| EngineError::close(e.to_string()))?;
        }
        if self.fail_close {
            return Err(EngineError::close("journal engine asked to fail close"));
        }
        Ok(())
    }
}

/// Handle with scripted per-key answers
///
/// Keys without a script read as absent; puts are recorded and read back.
#[derive(Debug, Default)]
pub struct FaultyHandle {
    answers: HashMap<Vec<u8>, Result<Vec<u8>, EngineError>>,
}

impl FaultyHandle {
    /// Handle where every key is absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `value` for keyspace index `index`
    pub fn with_value(mut self, index: u64, value: &[u8]) -> Self {
        self.answers.insert(Keyspace::key(index), Ok(value.to_vec()));
        self
    }

    /// Answer `error` for keyspace index `index`
    pub fn with_error(mut self, index: u64, error: EngineError) -> Self {
        self.answers.insert(Keyspace::key(index), Err(error));
        self
    }
}

impl EngineHandle for FaultyHandle {
    fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.answers.insert(key.to_vec(), Ok(value.to_vec()));
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        match self.answers.get(key) {
            Some(Ok(value)) => Ok(Some(value.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }

    fn compact(&mut self, _low: &[u8], _high: &[u8]) -> EngineResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        Ok(())
    }
}
