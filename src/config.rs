//! Cache construction configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default size classes in bytes, tuned for serialized spreadsheet cells.
pub const DEFAULT_SIZE_CLASSES: [usize; 5] = [1024, 2048, 3072, 4096, 5120];

/// Namespace prefix the host prepends to every key. It carries no entropy,
/// so it is stripped before keys enter the in-memory index.
pub const DEFAULT_STRIP_PREFIX: &str = "spreadsheet.";

/// Configuration for a [`SlotCache`](crate::SlotCache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backing directory for all size-class and overflow files.
    pub directory: PathBuf,
    /// Ascending byte thresholds; one backing file per class.
    pub size_classes: Vec<usize>,
    /// Remove the backing directory when the cache is dropped.
    pub auto_clear_on_exit: bool,
    /// Key prefix stripped during normalization.
    pub strip_prefix: String,
}

impl CacheConfig {
    /// Create a configuration with default size classes and auto-clear on.
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            size_classes: DEFAULT_SIZE_CLASSES.to_vec(),
            auto_clear_on_exit: true,
            strip_prefix: DEFAULT_STRIP_PREFIX.to_string(),
        }
    }

    /// Replace the size-class thresholds.
    pub fn with_size_classes(mut self, size_classes: Vec<usize>) -> Self {
        self.size_classes = size_classes;
        self
    }

    /// Control whether the backing directory is removed on drop.
    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear_on_exit = auto_clear;
        self
    }

    /// Replace the normalization prefix.
    pub fn with_strip_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.strip_prefix = prefix.into();
        self
    }

    /// Validate the configuration.
    ///
    /// Size classes must be non-empty, positive and strictly ascending so
    /// that "smallest class that fits" is well defined and the handle map
    /// stays small and fixed.
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "backing directory path is empty".to_string(),
            ));
        }
        if self.size_classes.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one size class is required".to_string(),
            ));
        }
        if self.size_classes[0] == 0 {
            return Err(Error::InvalidConfig(
                "size classes must be positive".to_string(),
            ));
        }
        for pair in self.size_classes.windows(2) {
            if pair[1] <= pair[0] {
                return Err(Error::InvalidConfig(format!(
                    "size classes must be strictly ascending, got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("./cache");
        assert_eq!(config.size_classes, vec![1024, 2048, 3072, 4096, 5120]);
        assert!(config.auto_clear_on_exit);
        assert_eq!(config.strip_prefix, "spreadsheet.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = CacheConfig::new("./cache")
            .with_size_classes(vec![512, 4096])
            .with_auto_clear(false)
            .with_strip_prefix("cells.");
        assert_eq!(config.size_classes, vec![512, 4096]);
        assert!(!config.auto_clear_on_exit);
        assert_eq!(config.strip_prefix, "cells.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_directory() {
        let config = CacheConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_empty_size_classes() {
        let config = CacheConfig::new("./cache").with_size_classes(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_size_class() {
        let config = CacheConfig::new("./cache").with_size_classes(vec![0, 1024]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsorted_size_classes() {
        let config = CacheConfig::new("./cache").with_size_classes(vec![2048, 1024]);
        assert!(config.validate().is_err());

        let config = CacheConfig::new("./cache").with_size_classes(vec![1024, 1024]);
        assert!(config.validate().is_err());
    }
}
