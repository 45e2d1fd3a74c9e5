//! Fixed-width slot storage, one backing file per size class
//!
//! Each size class owns an append-style file `{size_class}.bin`. Slots are
//! exactly `size_class` bytes wide and separated by one gap byte, so slot
//! `i` lives at offset `i * (size_class + 1)`. Offsets are handed out by a
//! per-class high-water counter that only grows: a slot abandoned by a
//! delete or a class migration is never reallocated, only counted as dead.

use crate::error::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::debug;

/// Byte used to right-pad values to the slot width.
const FILL_BYTE: u8 = b' ';

/// Per-size-class slot storage.
pub struct SlotStore {
    /// Backing directory for the class files
    dir: PathBuf,
    /// Open handles, one per size class, created lazily
    files: HashMap<usize, File>,
    /// Next free offset per size class (high-water mark)
    next_offset: HashMap<usize, u64>,
    /// Abandoned slot count per size class
    dead_slots: HashMap<usize, u64>,
}

impl SlotStore {
    /// Create a slot store rooted at `dir`. No files are touched until the
    /// first use of a size class.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            files: HashMap::new(),
            next_offset: HashMap::new(),
            dead_slots: HashMap::new(),
        }
    }

    /// Get the open handle for a size class, creating the backing file on
    /// first use. The file is truncated so leftovers from a prior run can
    /// never be read back.
    fn handle(&mut self, size_class: usize) -> Result<&mut File> {
        match self.files.entry(size_class) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.dir.join(format!("{}.bin", size_class));
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)
                    .map_err(|e| {
                        Error::Storage(format!("Failed to open slot file {:?}: {}", path, e))
                    })?;
                debug!(?path, size_class, "Opened slot file");
                Ok(entry.insert(file))
            }
        }
    }

    /// Hand out the next free offset for a size class and advance the
    /// high-water mark by the slot stride.
    pub fn allocate(&mut self, size_class: usize) -> u64 {
        let next = self.next_offset.entry(size_class).or_insert(0);
        let offset = *next;
        *next += size_class as u64 + 1;
        debug!(size_class, offset, "Allocated slot");
        offset
    }

    /// Write `bytes` into the slot at `offset`, right-padded to the slot
    /// width. The facade's classification guarantees `bytes` fits.
    pub fn write(&mut self, size_class: usize, offset: u64, bytes: &[u8]) -> Result<()> {
        debug_assert!(bytes.len() <= size_class);

        let mut padded = Vec::with_capacity(size_class);
        padded.extend_from_slice(bytes);
        padded.resize(size_class, FILL_BYTE);

        let file = self.handle(size_class)?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::Storage(format!("Seek failed: {}", e)))?;
        file.write_all(&padded)
            .map_err(|e| Error::Storage(format!("Write failed: {}", e)))?;

        debug!(size_class, offset, len = bytes.len(), "Wrote slot");
        Ok(())
    }

    /// Read the slot at `offset` and strip the trailing padding. Returns
    /// empty bytes for a slot that was written empty.
    pub fn read(&mut self, size_class: usize, offset: u64) -> Result<Vec<u8>> {
        let file = self.handle(size_class)?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::Storage(format!("Seek failed: {}", e)))?;

        let mut buf = vec![0u8; size_class];
        file.read_exact(&mut buf)
            .map_err(|e| Error::Storage(format!("Read failed: {}", e)))?;

        let len = buf
            .iter()
            .rposition(|&b| b != FILL_BYTE)
            .map_or(0, |i| i + 1);
        buf.truncate(len);

        debug!(size_class, offset, len, "Read slot");
        Ok(buf)
    }

    /// Count a slot whose index entry was removed. The bytes stay on disk.
    pub fn abandon(&mut self, size_class: usize) {
        *self.dead_slots.entry(size_class).or_insert(0) += 1;
        debug!(size_class, "Abandoned slot");
    }

    /// Drop every open handle and reset the allocation state. Used by
    /// `clear` before the backing directory is removed.
    pub fn close_all(&mut self) {
        self.files.clear();
        self.next_offset.clear();
        self.dead_slots.clear();
    }

    /// Per-class allocation statistics for every class touched so far.
    pub fn stats(&self) -> Vec<SizeClassStats> {
        let mut classes: Vec<usize> = self.next_offset.keys().copied().collect();
        classes.sort_unstable();

        classes
            .into_iter()
            .map(|size_class| {
                let stride = size_class as u64 + 1;
                let high_water = self.next_offset.get(&size_class).copied().unwrap_or(0);
                let total = high_water / stride;
                let dead = self.dead_slots.get(&size_class).copied().unwrap_or(0);
                SizeClassStats {
                    slot_size: size_class,
                    total_slots: total,
                    dead_slots: dead,
                    live_slots: total - dead,
                    high_water,
                }
            })
            .collect()
    }
}

/// Allocation statistics for one size class.
#[derive(Debug, Clone, Copy)]
pub struct SizeClassStats {
    /// Slot width in bytes
    pub slot_size: usize,
    /// Slots ever allocated in this class
    pub total_slots: u64,
    /// Allocated slots whose key mapping was removed
    pub dead_slots: u64,
    /// Slots still referenced by the key index
    pub live_slots: u64,
    /// File high-water mark in bytes
    pub high_water: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_monotonic() {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        // Stride is size_class + 1 (one separator byte between slots).
        assert_eq!(store.allocate(1024), 0);
        assert_eq!(store.allocate(1024), 1025);
        assert_eq!(store.allocate(1024), 2050);

        // Classes allocate independently.
        assert_eq!(store.allocate(2048), 0);
        assert_eq!(store.allocate(2048), 2049);
    }

    #[test]
    fn test_write_read_round_trip() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let offset = store.allocate(64);
        store.write(64, offset, b"hello slots")?;
        assert_eq!(store.read(64, offset)?, b"hello slots");
        Ok(())
    }

    #[test]
    fn test_read_strips_padding_only() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        // Interior and leading spaces survive; only the pad is stripped.
        let offset = store.allocate(64);
        store.write(64, offset, b"  a b ")?;
        assert_eq!(store.read(64, offset)?, b"  a b");
        Ok(())
    }

    #[test]
    fn test_full_width_value() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let value = vec![b'z'; 64];
        let offset = store.allocate(64);
        store.write(64, offset, &value)?;
        assert_eq!(store.read(64, offset)?, value);
        Ok(())
    }

    #[test]
    fn test_empty_value() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let offset = store.allocate(64);
        store.write(64, offset, b"")?;
        assert_eq!(store.read(64, offset)?, b"");
        Ok(())
    }

    #[test]
    fn test_neighbor_slots_do_not_clobber() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let first = store.allocate(32);
        let second = store.allocate(32);
        store.write(32, first, b"first")?;
        store.write(32, second, b"second")?;

        assert_eq!(store.read(32, first)?, b"first");
        assert_eq!(store.read(32, second)?, b"second");
        Ok(())
    }

    #[test]
    fn test_lazy_file_creation() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let path = dir.path().join("128.bin");
        assert!(!path.exists());

        let offset = store.allocate(128);
        store.write(128, offset, b"x")?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_dead_slot_accounting() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let mut store = SlotStore::new(dir.path());

        let a = store.allocate(64);
        let _b = store.allocate(64);
        store.write(64, a, b"a")?;
        store.abandon(64);

        let stats = store.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].slot_size, 64);
        assert_eq!(stats[0].total_slots, 2);
        assert_eq!(stats[0].dead_slots, 1);
        assert_eq!(stats[0].live_slots, 1);
        assert_eq!(stats[0].high_water, 130);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_storage_error() {
        let mut store = SlotStore::new("/nonexistent/slotcache-test");
        let offset = store.allocate(64);
        assert!(matches!(
            store.write(64, offset, b"x"),
            Err(Error::Storage(_))
        ));
    }
}
