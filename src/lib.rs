//! Slot Cache
//!
//! A process-local, disk-backed key/value cache that bounds the memory
//! growth of a host spreadsheet engine. Values are packed into fixed-width
//! slots organized by size classes, one backing file per class; values too
//! large for any class fall back to one file per key.
//!
//! # Architecture
//!
//! ```text
//! SlotCache (facade, SimpleCache contract)
//!   ├─→ SlotStore
//!   │     ├─→ 1024.bin  [slot][slot][slot]...
//!   │     ├─→ 2048.bin  [slot][slot]...
//!   │     └─→ 5120.bin  [slot]...
//!   ├─→ KeyIndex (in-memory)
//!   │     └─→ "A1" → (class=1024, offset=0)
//!   │     └─→ "B7" → (class=2048, offset=2049)
//!   ├─→ OverflowStore
//!   │     └─→ {dir}/{key} one raw file per oversized value
//!   └─→ BackingDir (created on construction, removed on drop)
//! ```
//!
//! Each size class grows append-style; deleting a key only removes its
//! index entry and the slot bytes stay on disk as dead space. The index is
//! never persisted: a fresh cache instance starts logically empty.

#![warn(rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod index;
pub mod lifecycle;
pub mod overflow;
pub mod serializer;
pub mod slot_store;

// Re-exports for convenience
pub use cache::{CacheStats, SimpleCache, SlotCache};
pub use config::{CacheConfig, DEFAULT_SIZE_CLASSES};
pub use serializer::{JsonSerializer, Serializer};
pub use slot_store::SizeClassStats;

/// Slot cache error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Storage error: {0}")]
        Storage(String),

        #[error("Serialization error: {0}")]
        Serialization(String),

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
