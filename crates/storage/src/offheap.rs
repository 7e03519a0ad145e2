//! Fixed-capacity off-heap hash table
//!
//! Entries live outside the Rust heap in `memmap2` mappings: anonymous
//! mappings for transient tables, or regions of one backing file when the
//! table is persisted. The table never grows; its capacity is declared up
//! front and inserts beyond it fail with `CapacityExceeded`.
//!
//! ## Layout
//!
//! ```text
//! [header region: REGION_ALIGN bytes]
//!   magic "IBOH" 4B | version u32 | capacity u64 | segments u32
//!   | slots_per_segment u32 | entries_per_segment u32 | max_value_len u32
//! [segment 0: segment_bytes]
//!   [slot table: slots_per_segment * 16B]
//!     key u64 LE | value offset u32 LE | value len u16 LE | flags u16 LE
//!   [value arena: entries_per_segment * max_value_len bytes]
//! [segment 1] ...
//! ```
//!
//! Keys are constant width (8 bytes); values are variable width UTF-8 up
//! to `max_value_len` bytes. Each segment is an open-addressing table with
//! linear probing, kept at most half full, and is guarded by its own
//! mutex: an insert-if-absent holds the segment lock across the probe and
//! the write, so it is atomic per key.
//!
//! Region sizes are multiples of 64 KiB so every segment can be mapped at
//! its own file offset (64 KiB covers page size and Windows allocation
//! granularity).

use byteorder::{ByteOrder, LittleEndian};
use indexbench_core::{BackendKind, Error, Result};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use xxhash_rust::xxh3::xxh3_64;

/// Alignment of every mapped region
pub const REGION_ALIGN: usize = 64 * 1024;
/// Bytes per slot-table entry
pub const SLOT_SIZE: usize = 16;
/// Magic bytes identifying an off-heap table file
const MAGIC: &[u8; 4] = b"IBOH";
/// Current format version
const VERSION: u32 = 1;
/// Encoded header length
const HEADER_LEN: usize = 4 + 4 + 8 + 4 + 4 + 4 + 4;
const MAX_SEGMENTS: usize = 64;
const ENTRIES_PER_SEGMENT_TARGET: usize = 1024;
const SLOT_OCCUPIED: u16 = 1;

/// Geometry of a table derived from its declared capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Declared entry capacity (hard limit)
    pub capacity: usize,
    /// Maximum value width in bytes
    pub max_value_len: usize,
    /// Number of independently locked segments (power of two)
    pub segments: usize,
    /// Entry limit of one segment
    pub entries_per_segment: usize,
    /// Slot-table size of one segment (power of two, >= 2x entries)
    pub slots_per_segment: usize,
    /// Value arena size of one segment
    pub arena_bytes: usize,
    /// Mapped size of one segment
    pub segment_bytes: usize,
}

impl TableLayout {
    /// Compute the layout for `capacity` entries of at most `max_value_len` bytes.
    pub fn for_capacity(capacity: usize, max_value_len: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig("off-heap capacity must be > 0".into()));
        }
        if max_value_len == 0 || max_value_len > u16::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "off-heap max_value_len must be in 1..={}",
                u16::MAX
            )));
        }

        let segments = (capacity / ENTRIES_PER_SEGMENT_TARGET)
            .next_power_of_two()
            .min(MAX_SEGMENTS);
        // Hashes never split evenly across segments, so each one gets slack
        // on top of its share. The global capacity stays exact.
        let entries_per_segment = if segments == 1 {
            capacity
        } else {
            let share = (capacity + segments - 1) / segments;
            share + share / 2 + 32
        };
        let slots_per_segment = (entries_per_segment * 2).next_power_of_two();
        let arena_bytes = entries_per_segment
            .checked_mul(max_value_len)
            .filter(|bytes| *bytes <= u32::MAX as usize)
            .ok_or(Error::CapacityExceeded { capacity })?;
        let segment_bytes = align_up(slots_per_segment * SLOT_SIZE + arena_bytes);

        Ok(Self {
            capacity,
            max_value_len,
            segments,
            entries_per_segment,
            slots_per_segment,
            arena_bytes,
            segment_bytes,
        })
    }

    /// Size of a backing file holding this table
    pub fn file_len(&self) -> u64 {
        (REGION_ALIGN + self.segments * self.segment_bytes) as u64
    }

    fn segment_offset(&self, segment: usize) -> u64 {
        (REGION_ALIGN + segment * self.segment_bytes) as u64
    }

    /// Segment index and home slot of a key
    #[inline]
    fn locate(&self, key: u64) -> (usize, usize) {
        let mix = xxh3_64(&key.to_le_bytes());
        let segment = (mix >> 58) as usize & (self.segments - 1);
        let slot = mix as usize & (self.slots_per_segment - 1);
        (segment, slot)
    }
}

fn align_up(n: usize) -> usize {
    (n + REGION_ALIGN - 1) / REGION_ALIGN * REGION_ALIGN
}

/// Header fields of a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    /// Declared entry capacity
    pub capacity: u64,
    /// Segment count
    pub segments: u32,
    /// Slot-table size per segment
    pub slots_per_segment: u32,
    /// Entry limit per segment
    pub entries_per_segment: u32,
    /// Maximum value width
    pub max_value_len: u32,
}

impl TableHeader {
    fn from_layout(layout: &TableLayout) -> Self {
        Self {
            capacity: layout.capacity as u64,
            segments: layout.segments as u32,
            slots_per_segment: layout.slots_per_segment as u32,
            entries_per_segment: layout.entries_per_segment as u32,
            max_value_len: layout.max_value_len as u32,
        }
    }

    fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(MAGIC);
        LittleEndian::write_u32(&mut buf[4..8], VERSION);
        LittleEndian::write_u64(&mut buf[8..16], self.capacity);
        LittleEndian::write_u32(&mut buf[16..20], self.segments);
        LittleEndian::write_u32(&mut buf[20..24], self.slots_per_segment);
        LittleEndian::write_u32(&mut buf[24..28], self.entries_per_segment);
        LittleEndian::write_u32(&mut buf[28..32], self.max_value_len);
    }

    /// Read and validate the header of a table file
    pub fn read(path: &Path) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        File::open(path)?.read_exact(&mut buf)?;
        if &buf[0..4] != MAGIC {
            return Err(invalid_data("invalid off-heap table magic").into());
        }
        let version = LittleEndian::read_u32(&buf[4..8]);
        if version != VERSION {
            return Err(invalid_data(format!("unsupported off-heap table version: {}", version)).into());
        }
        Ok(Self {
            capacity: LittleEndian::read_u64(&buf[8..16]),
            segments: LittleEndian::read_u32(&buf[16..20]),
            slots_per_segment: LittleEndian::read_u32(&buf[20..24]),
            entries_per_segment: LittleEndian::read_u32(&buf[24..28]),
            max_value_len: LittleEndian::read_u32(&buf[28..32]),
        })
    }
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

/// One independently locked open-addressing table
struct Segment {
    map: MmapMut,
    anonymous: bool,
    slots: usize,
    arena_start: usize,
    arena_bytes: usize,
    arena_used: usize,
    len: usize,
    max_entries: usize,
}

impl Segment {
    fn new(map: MmapMut, anonymous: bool, layout: &TableLayout) -> Self {
        Self {
            map,
            anonymous,
            slots: layout.slots_per_segment,
            arena_start: layout.slots_per_segment * SLOT_SIZE,
            arena_bytes: layout.arena_bytes,
            arena_used: 0,
            len: 0,
            max_entries: layout.entries_per_segment,
        }
    }

    #[inline]
    fn slot(&self, idx: usize) -> &[u8] {
        &self.map[idx * SLOT_SIZE..(idx + 1) * SLOT_SIZE]
    }

    /// Linear probe from `home`; `None` only if every slot is occupied
    fn probe(&self, key: u64, home: usize) -> Option<Probe> {
        let mask = self.slots - 1;
        let mut idx = home;
        for _ in 0..self.slots {
            let slot = self.slot(idx);
            if LittleEndian::read_u16(&slot[14..16]) & SLOT_OCCUPIED == 0 {
                return Some(Probe::Vacant(idx));
            }
            if LittleEndian::read_u64(&slot[0..8]) == key {
                return Some(Probe::Found(idx));
            }
            idx = (idx + 1) & mask;
        }
        None
    }

    fn read_value(&self, idx: usize) -> Result<String> {
        let slot = self.slot(idx);
        let offset = LittleEndian::read_u32(&slot[8..12]) as usize;
        let len = LittleEndian::read_u16(&slot[12..14]) as usize;
        let start = self.arena_start + offset;
        let bytes = &self.map[start..start + len];
        String::from_utf8(bytes.to_vec()).map_err(|e| invalid_data(e.to_string()).into())
    }

    /// Append `value` to the arena and point slot `idx` at it
    fn write_entry(&mut self, idx: usize, key: u64, value: &[u8]) -> bool {
        if self.arena_used + value.len() > self.arena_bytes {
            return false;
        }
        let offset = self.arena_used;
        let start = self.arena_start + offset;
        self.map[start..start + value.len()].copy_from_slice(value);
        self.arena_used += value.len();

        let slot = &mut self.map[idx * SLOT_SIZE..(idx + 1) * SLOT_SIZE];
        LittleEndian::write_u64(&mut slot[0..8], key);
        LittleEndian::write_u32(&mut slot[8..12], offset as u32);
        LittleEndian::write_u16(&mut slot[12..14], value.len() as u16);
        LittleEndian::write_u16(&mut slot[14..16], SLOT_OCCUPIED);
        true
    }

    /// Replace the value of an occupied slot, in place when it fits
    fn overwrite(&mut self, idx: usize, key: u64, value: &[u8]) -> bool {
        let (offset, old_len) = {
            let slot = self.slot(idx);
            (
                LittleEndian::read_u32(&slot[8..12]) as usize,
                LittleEndian::read_u16(&slot[12..14]) as usize,
            )
        };
        if value.len() > old_len {
            return self.write_entry(idx, key, value);
        }
        let start = self.arena_start + offset;
        self.map[start..start + value.len()].copy_from_slice(value);
        let slot = &mut self.map[idx * SLOT_SIZE..(idx + 1) * SLOT_SIZE];
        LittleEndian::write_u16(&mut slot[12..14], value.len() as u16);
        true
    }

    /// Drop every entry. Anonymous mappings are replaced so their pages go
    /// back to the OS; file-backed slot tables are zeroed.
    fn clear(&mut self) -> io::Result<()> {
        if self.anonymous {
            self.map = MmapOptions::new().len(self.map.len()).map_anon()?;
        } else {
            let table_bytes = self.slots * SLOT_SIZE;
            self.map[..table_bytes].fill(0);
        }
        self.arena_used = 0;
        self.len = 0;
        Ok(())
    }
}

struct Mapped {
    header: Option<MmapMut>,
    segments: Vec<Mutex<Segment>>,
}

/// Fixed-capacity `u64 -> String` table outside the Rust heap
pub struct OffHeapTable {
    name: &'static str,
    layout: TableLayout,
    path: Option<PathBuf>,
    len: AtomicUsize,
    inner: RwLock<Option<Mapped>>,
}

impl std::fmt::Debug for OffHeapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffHeapTable")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("path", &self.path)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl OffHeapTable {
    /// Transient table in anonymous mappings
    pub fn anonymous(name: &'static str, capacity: usize, max_value_len: usize) -> Result<Self> {
        let layout = TableLayout::for_capacity(capacity, max_value_len)?;
        let mut segments = Vec::with_capacity(layout.segments);
        for _ in 0..layout.segments {
            let map = MmapOptions::new().len(layout.segment_bytes).map_anon()?;
            segments.push(Mutex::new(Segment::new(map, true, &layout)));
        }
        Ok(Self {
            name,
            layout,
            path: None,
            len: AtomicUsize::new(0),
            inner: RwLock::new(Some(Mapped {
                header: None,
                segments,
            })),
        })
    }

    /// Table persisted to `path`
    ///
    /// A stale file at `path` is deleted and recreated at the full size.
    pub fn create_file(
        name: &'static str,
        path: &Path,
        capacity: usize,
        max_value_len: usize,
    ) -> Result<Self> {
        let layout = TableLayout::for_capacity(capacity, max_value_len)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(layout.file_len())?;

        // SAFETY: the file was just created by this process and is only
        // accessed through these mappings for the table's lifetime.
        let mut header = unsafe { MmapOptions::new().len(REGION_ALIGN).map_mut(&file)? };
        TableHeader::from_layout(&layout).write_to(&mut header[..HEADER_LEN]);

        let mut segments = Vec::with_capacity(layout.segments);
        for i in 0..layout.segments {
            // SAFETY: as above; segment regions are disjoint and aligned.
            let map = unsafe {
                MmapOptions::new()
                    .offset(layout.segment_offset(i))
                    .len(layout.segment_bytes)
                    .map_mut(&file)?
            };
            segments.push(Mutex::new(Segment::new(map, false, &layout)));
        }

        Ok(Self {
            name,
            layout,
            path: Some(path.to_path_buf()),
            len: AtomicUsize::new(0),
            inner: RwLock::new(Some(Mapped {
                header: Some(header),
                segments,
            })),
        })
    }

    /// Table name used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Geometry of this table
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Backing file, if persisted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `close()` has run
    pub fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }

    fn check_value(&self, value: &str) -> Result<()> {
        if value.len() > self.layout.max_value_len {
            return Err(Error::ValueTooLarge {
                len: value.len(),
                max: self.layout.max_value_len,
            });
        }
        Ok(())
    }

    fn full(&self) -> Error {
        Error::CapacityExceeded {
            capacity: self.layout.capacity,
        }
    }

    /// Claim one entry of the global capacity
    fn reserve(&self) -> Result<()> {
        let capacity = self.layout.capacity;
        self.len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| self.full())
    }

    /// Fetch the value stored under `key`
    pub fn get(&self, key: u64) -> Result<Option<String>> {
        let guard = self.inner.read();
        let mapped = guard.as_ref().ok_or(Error::Closed(BackendKind::Persistent))?;
        let (segment, home) = self.layout.locate(key);
        let seg = mapped.segments[segment].lock();
        match seg.probe(key, home) {
            Some(Probe::Found(idx)) => seg.read_value(idx).map(Some),
            _ => Ok(None),
        }
    }

    /// Insert or replace the value under `key`
    pub fn put(&self, key: u64, value: &str) -> Result<()> {
        self.check_value(value)?;
        let guard = self.inner.read();
        let mapped = guard.as_ref().ok_or(Error::Closed(BackendKind::Persistent))?;
        let (segment, home) = self.layout.locate(key);
        let mut seg = mapped.segments[segment].lock();
        match seg.probe(key, home).ok_or_else(|| self.full())? {
            Probe::Found(idx) => {
                if !seg.overwrite(idx, key, value.as_bytes()) {
                    return Err(self.full());
                }
            }
            Probe::Vacant(idx) => self.insert_vacant(&mut seg, idx, key, value)?,
        }
        Ok(())
    }

    /// Insert `value` under `key` unless present; returns the existing value
    pub fn put_if_absent(&self, key: u64, value: &str) -> Result<Option<String>> {
        self.check_value(value)?;
        let guard = self.inner.read();
        let mapped = guard.as_ref().ok_or(Error::Closed(BackendKind::Persistent))?;
        let (segment, home) = self.layout.locate(key);
        let mut seg = mapped.segments[segment].lock();
        match seg.probe(key, home).ok_or_else(|| self.full())? {
            Probe::Found(idx) => seg.read_value(idx).map(Some),
            Probe::Vacant(idx) => {
                self.insert_vacant(&mut seg, idx, key, value)?;
                Ok(None)
            }
        }
    }

    fn insert_vacant(&self, seg: &mut Segment, idx: usize, key: u64, value: &str) -> Result<()> {
        if seg.len >= seg.max_entries {
            return Err(self.full());
        }
        self.reserve()?;
        if !seg.write_entry(idx, key, value.as_bytes()) {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return Err(self.full());
        }
        seg.len += 1;
        Ok(())
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        let guard = self.inner.read();
        let mapped = guard.as_ref().ok_or(Error::Closed(BackendKind::Persistent))?;
        for segment in &mapped.segments {
            segment.lock().clear()?;
        }
        self.len.store(0, Ordering::Release);
        Ok(())
    }

    /// Flush (when persisted) and unmap. Idempotent.
    pub fn close(&self) -> Result<()> {
        let Some(mapped) = self.inner.write().take() else {
            return Ok(());
        };
        self.len.store(0, Ordering::Release);

        let mut first_error = None;
        if self.path.is_some() {
            let flushes = mapped
                .segments
                .iter()
                .map(|s| s.lock().map.flush())
                .chain(mapped.header.as_ref().map(|h| h.flush()));
            for result in flushes {
                if let Err(e) = result {
                    first_error.get_or_insert(e);
                }
            }
        }
        drop(mapped);

        match first_error {
            None => Ok(()),
            Some(e) => Err(Error::ResourceRelease {
                resource: self
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| self.name.to_string()),
                reason: e.to_string(),
            }),
        }
    }
}
