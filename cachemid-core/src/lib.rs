//! # Cachemid Core
//!
//! Read-through caching with stampede protection and a stale second tier.
//!
//! A [`Cache`] sits between an application and a slow data source. On a miss,
//! concurrent callers race for a short-lived lock stored next to the data; the
//! winner runs the [`Loader`] and fills the cache while the losers are served
//! the longer-lived tier-2 copy (or [`Error::DataNotExist`] when there is
//! none). The lock lives in the same [`KeyStore`] as the data, so with a store
//! shared between processes the protection is system-wide.
//!
//! ## Module Organization
//!
//! - [`keys`] - deterministic, bounded store keys per tier and lock
//! - [`store`] - the [`KeyStore`] capability backing stores implement
//! - [`lock`] - advisory locks with a hard timeout
//! - [`loader`] - the application-supplied data source
//! - [`cache`] - the read-through orchestrator and its builder
//!
//! [`MemoryStore`] is the in-process store; networked stores live in their own
//! crates.
mod cache_entry;
mod config;
mod error;
mod memory_store;

pub mod cache;
pub mod keys;
pub mod loader;
pub mod lock;
pub mod store;

#[cfg(feature = "stats")]
mod stats;

pub use cache::{Cache, CacheBuilder, Lookup, Source};
pub use cache_entry::CacheEntry;
pub use config::{CacheConfig, DEFAULT_EXPIRE_TIME, DEFAULT_LOCK_TTL};
pub use error::{BoxError, Error, Result};
pub use keys::{derive_key, namespace_prefix, Discriminator};
pub use loader::{Loaded, Loader};
pub use lock::{LockManager, LOCK_SENTINEL};
pub use memory_store::MemoryStore;
pub use store::{effective_ttl, KeyStore};

#[cfg(feature = "stats")]
pub use stats::{CacheStats, StatsSnapshot};
