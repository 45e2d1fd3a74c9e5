//! One-file-per-key overflow storage
//!
//! Fallback for values larger than every configured size class. Each value
//! lives in `{dir}/{normalized_key}` as raw bytes with no header. Presence
//! is tracked by an in-memory set; like the key index, the set is rebuilt
//! empty on every construction, so files from a prior run are invisible.
//!
//! Overflow files share the backing directory with the `{size_class}.bin`
//! slot files, so a key shaped like a slot file name is rejected at write
//! rather than allowed to clobber a class's backing file.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// True for keys that collide with a size-class file name, `{digits}.bin`.
fn shadows_slot_file(key: &str) -> bool {
    key.strip_suffix(".bin")
        .is_some_and(|stem| !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()))
}

/// Whole-file storage for oversized values.
#[derive(Debug)]
pub struct OverflowStore {
    dir: PathBuf,
    present: HashSet<String>,
}

impl OverflowStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            present: HashSet::new(),
        }
    }

    /// Write `bytes` to the key's file, overwriting any previous value.
    /// Keys named like a slot file are refused.
    pub fn write(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        if shadows_slot_file(key) {
            return Err(Error::Storage(format!(
                "Overflow key '{}' would shadow a slot file",
                key
            )));
        }
        let path = self.dir.join(key);
        fs::write(&path, bytes)
            .map_err(|e| Error::Storage(format!("Failed to write overflow file {:?}: {}", path, e)))?;
        self.present.insert(key.to_string());
        debug!(key, len = bytes.len(), "Wrote overflow file");
        Ok(())
    }

    /// Read the key's full contents, or `None` if the key is not tracked.
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if !self.present.contains(key) {
            return Ok(None);
        }
        let path = self.dir.join(key);
        let bytes = fs::read(&path)
            .map_err(|e| Error::Storage(format!("Failed to read overflow file {:?}: {}", path, e)))?;
        debug!(key, len = bytes.len(), "Read overflow file");
        Ok(Some(bytes))
    }

    /// Drop the key's marker and remove its file. A file that is already
    /// gone is not an error; any other removal failure is.
    pub fn forget(&mut self, key: &str) -> Result<()> {
        if !self.present.remove(key) {
            return Ok(());
        }
        let path = self.dir.join(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed overflow file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove overflow file {:?}: {}",
                path, e
            ))),
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.present.contains(key)
    }

    /// Number of overflow keys currently tracked.
    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Drop every marker. Files are handled by the facade's `clear`, which
    /// removes the whole backing directory.
    pub fn clear(&mut self) {
        self.present.clear();
    }
}
