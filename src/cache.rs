//! Cache facade
//!
//! Implements the generic cache contract over the slot store, key index and
//! overflow store. Owns classification (smallest size class that fits the
//! encoded value, overflow otherwise) and migration bookkeeping when a
//! re-set value changes class.

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::index::KeyIndex;
use crate::lifecycle::BackingDir;
use crate::overflow::OverflowStore;
use crate::serializer::{JsonSerializer, Serializer};
use crate::slot_store::{SizeClassStats, SlotStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Generic cache contract consumed by the host application.
///
/// `ttl` parameters are accepted for interface compatibility and ignored:
/// entries never expire on their own. Absence is a clean `Ok(default)` /
/// `Ok(false)`; storage and serialization failures are errors, never
/// silently mapped to a miss.
pub trait SimpleCache {
    /// Fetch a value, or `default` if the key is absent.
    fn get<V: DeserializeOwned>(&mut self, key: &str, default: V) -> Result<V>;

    /// Store a value, relocating it across size classes if needed.
    fn set<V: Serialize>(&mut self, key: &str, value: &V, ttl: Option<Duration>) -> Result<bool>;

    /// Remove a key. Idempotent: deleting an absent key still succeeds.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Delete every entry and the backing directory itself.
    fn clear(&mut self) -> Result<bool>;

    /// Whether the key is currently present.
    fn has(&self, key: &str) -> Result<bool>;

    /// Lazily fetch one value per key, in input order.
    fn get_multiple<'a, K, I, V>(
        &'a mut self,
        keys: I,
        default: V,
    ) -> impl Iterator<Item = Result<V>> + 'a
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: 'a,
        K: AsRef<str>,
        V: DeserializeOwned + Clone + 'a;

    /// Apply `set` per entry. Not atomic: a failure partway through leaves
    /// earlier entries applied.
    fn set_multiple<K, V, I>(&mut self, values: I, ttl: Option<Duration>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize;

    /// Apply `delete` per key. Not atomic.
    fn delete_multiple<K, I>(&mut self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>;
}

/// Disk-backed size-class slot cache.
///
/// Single-threaded and single-writer: all mutation goes through `&mut self`
/// and the backing directory must not be shared with another instance.
pub struct SlotCache<S: Serializer = JsonSerializer> {
    // Stores are declared before the directory guard so their file handles
    // drop first.
    slots: SlotStore,
    index: KeyIndex,
    overflow: OverflowStore,
    serializer: S,
    size_classes: Vec<usize>,
    strip_prefix: String,
    dir: BackingDir,
}

impl SlotCache<JsonSerializer> {
    /// Open a cache with the default JSON serializer.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_serializer(config, JsonSerializer)
    }
}

impl<S: Serializer> SlotCache<S> {
    /// Open a cache with a custom serializer. Validates the configuration
    /// and creates the backing directory.
    pub fn with_serializer(config: CacheConfig, serializer: S) -> Result<Self> {
        config.validate()?;

        let dir = BackingDir::create(&config.directory, config.auto_clear_on_exit)?;
        let slots = SlotStore::new(&config.directory);
        let overflow = OverflowStore::new(&config.directory);

        info!(
            directory = ?config.directory,
            size_classes = ?config.size_classes,
            "Opened slot cache"
        );

        Ok(Self {
            slots,
            index: KeyIndex::new(),
            overflow,
            serializer,
            size_classes: config.size_classes,
            strip_prefix: config.strip_prefix,
            dir,
        })
    }

    /// Strip the configured namespace prefix so it never occupies index
    /// memory. Keys without the prefix pass through unchanged.
    fn normalize<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(&self.strip_prefix).unwrap_or(key)
    }

    /// Smallest configured size class that fits `len` bytes, or `None` for
    /// overflow.
    fn classify(&self, len: usize) -> Option<usize> {
        self.size_classes.iter().copied().find(|&class| len <= class)
    }

    /// Allocation and occupancy statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            slot_keys: self.index.len(),
            overflow_keys: self.overflow.len(),
            size_classes: self.slots.stats(),
        }
    }
}

impl<S: Serializer> SimpleCache for SlotCache<S> {
    fn get<V: DeserializeOwned>(&mut self, key: &str, default: V) -> Result<V> {
        let key = self.normalize(key);

        if let Some((size_class, offset)) = self.index.locate(key) {
            let bytes = self.slots.read(size_class, offset)?;
            return self.serializer.from_bytes(&bytes);
        }

        if self.overflow.exists(key) {
            let bytes = self.overflow.read(key)?.ok_or_else(|| {
                Error::Storage(format!("Overflow entry for key '{}' has no file", key))
            })?;
            return self.serializer.from_bytes(&bytes);
        }

        Ok(default)
    }

    fn set<V: Serialize>(&mut self, key: &str, value: &V, _ttl: Option<Duration>) -> Result<bool> {
        let key = self.normalize(key).to_string();
        let bytes = self.serializer.to_bytes(value)?;
        let class = self.classify(bytes.len());

        // A re-set that changes class abandons the old slot; the index
        // entry goes away, the bytes stay as dead space.
        if let Some((old_class, _)) = self.index.locate(&key) {
            if class != Some(old_class) {
                self.index.forget(&key);
                self.slots.abandon(old_class);
            }
        }
        if class.is_some() && self.overflow.exists(&key) {
            self.overflow.forget(&key)?;
        }

        match class {
            None => self.overflow.write(&key, &bytes)?,
            Some(size_class) => {
                let offset = match self.index.offset_of(size_class, &key) {
                    Some(offset) => offset,
                    None => {
                        let offset = self.slots.allocate(size_class);
                        self.index.record(size_class, key.clone(), offset);
                        offset
                    }
                };
                self.slots.write(size_class, offset, &bytes)?;
            }
        }

        debug!(%key, len = bytes.len(), ?class, "Set key");
        Ok(true)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let key = self.normalize(key).to_string();

        if let Some((size_class, _)) = self.index.forget(&key) {
            self.slots.abandon(size_class);
        }
        self.overflow.forget(&key)?;

        debug!(%key, "Deleted key");
        Ok(true)
    }

    fn clear(&mut self) -> Result<bool> {
        self.slots.close_all();
        self.index.clear();
        self.overflow.clear();
        self.dir.remove()?;
        Ok(true)
    }

    fn has(&self, key: &str) -> Result<bool> {
        let key = self.normalize(key);
        Ok(self.index.contains(key) || self.overflow.exists(key))
    }

    fn get_multiple<'a, K, I, V>(
        &'a mut self,
        keys: I,
        default: V,
    ) -> impl Iterator<Item = Result<V>> + 'a
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: 'a,
        K: AsRef<str>,
        V: DeserializeOwned + Clone + 'a,
    {
        keys.into_iter()
            .map(move |key| self.get(key.as_ref(), default.clone()))
    }

    fn set_multiple<K, V, I>(&mut self, values: I, ttl: Option<Duration>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        for (key, value) in values {
            self.set(key.as_ref(), &value, ttl)?;
        }
        Ok(true)
    }

    fn delete_multiple<K, I>(&mut self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.delete(key.as_ref())?;
        }
        Ok(true)
    }
}

/// Occupancy statistics for the whole cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Keys stored in size-class slots
    pub slot_keys: usize,
    /// Keys stored as overflow files
    pub overflow_keys: usize,
    /// Per-class allocation stats, ascending by slot size
    pub size_classes: Vec<SizeClassStats>,
}
