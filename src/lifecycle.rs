//! Backing directory lifecycle
//!
//! Creates the backing directory on construction and, when auto-clear is
//! enabled, removes it again when the guard drops. Drop runs on every exit
//! path, so teardown does not depend on process-exit hooks. The facade
//! declares this guard after its stores, which keeps every file handle
//! closed before the directory is removed.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scoped owner of the backing directory.
#[derive(Debug)]
pub struct BackingDir {
    path: PathBuf,
    auto_clear: bool,
}

impl BackingDir {
    /// Create the directory (and parents) if absent and return the guard.
    pub fn create<P: Into<PathBuf>>(path: P, auto_clear: bool) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)
            .map_err(|e| Error::Storage(format!("Failed to create cache directory {:?}: {}", path, e)))?;
        info!(?path, auto_clear, "Created cache directory");
        Ok(Self { path, auto_clear })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it. All handles into the
    /// directory must already be closed. A directory that is already gone
    /// is not an error, so repeated removal succeeds.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                info!(path = ?self.path, "Removed cache directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove cache directory {:?}: {}",
                self.path, e
            ))),
        }
    }
}

impl Drop for BackingDir {
    fn drop(&mut self) {
        if self.auto_clear {
            // Best effort: the directory may already be gone after clear().
            if fs::remove_dir_all(&self.path).is_ok() {
                debug!(path = ?self.path, "Auto-cleared cache directory on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_auto_clear() -> Result<()> {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");

        {
            let _guard = BackingDir::create(&dir, true)?;
            assert!(dir.is_dir());
        }
        assert!(!dir.exists());
        Ok(())
    }

    #[test]
    fn test_no_auto_clear_keeps_directory() -> Result<()> {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");

        {
            let _guard = BackingDir::create(&dir, false)?;
        }
        assert!(dir.is_dir());
        Ok(())
    }

    #[test]
    fn test_explicit_remove() -> Result<()> {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");

        let guard = BackingDir::create(&dir, true)?;
        fs::write(dir.join("1024.bin"), b"data").unwrap();
        guard.remove()?;
        assert!(!dir.exists());

        // Drop after an explicit remove must not panic.
        drop(guard);
        Ok(())
    }

    #[test]
    fn test_remove_is_idempotent() -> Result<()> {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");

        let guard = BackingDir::create(&dir, false)?;
        guard.remove()?;
        assert!(!dir.exists());

        // A second removal of an already-gone directory succeeds.
        guard.remove()?;
        Ok(())
    }

    #[test]
    fn test_create_nested() -> Result<()> {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("a").join("b").join("cache");

        let _guard = BackingDir::create(&dir, false)?;
        assert!(dir.is_dir());
        Ok(())
    }
}
