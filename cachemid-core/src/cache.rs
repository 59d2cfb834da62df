//! The read-through orchestrator.
//!
//! [`Cache::get`] is re-entered independently by every concurrent caller:
//!
//! ```text
//! get(dims)
//!   ├─ tier-1 hit ─────────────────────────────────────────────▶ Ok(Tier1)
//!   └─ miss ─▶ try lock(dims)
//!        ├─ acquired ─▶ loader(dims)
//!        │     ├─ Ok(cache)     ─▶ write tier-1 (+ tier-2) ──────▶ Ok(Loader)
//!        │     ├─ Ok(transient) ─────────────────────────────────▶ Ok(Loader)
//!        │     └─ Err           ─▶ read tier-2 ──▶ Err(Loader { stale })
//!        │   (lock released on every path)
//!        └─ held elsewhere
//!              ├─ tier-2 enabled and hit ────────────────────────▶ Ok(Tier2)
//!              └─ otherwise ─────────────────────────────────────▶ Err(DataNotExist)
//! ```
//!
//! At most one loader call per dimension tuple runs per lock TTL window:
//! process-wide with [`MemoryStore`](crate::MemoryStore), system-wide with a
//! store shared between processes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::keys::{derive_key, namespace_prefix, Discriminator};
use crate::loader::{Loaded, Loader};
use crate::lock::LockManager;
use crate::store::KeyStore;

#[cfg(feature = "stats")]
use crate::CacheStats;

/// Where the value of a successful [`Cache::get`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Tier-1 entry; no lock, no loader.
    Tier1,
    /// Tier-2 entry served while another caller held the lock.
    Tier2,
    /// This caller held the lock and ran (or skipped) the loader.
    Loader,
}

/// A value returned by [`Cache::get`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    pub source: Source,
}

impl Lookup {
    /// True when the value came from a cache tier without running the loader.
    pub fn is_hit(&self) -> bool {
        matches!(self.source, Source::Tier1 | Source::Tier2)
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// A two-tier read-through cache with stampede protection.
///
/// One instance per logical dataset, built once and shared (`Arc<Cache>`) by
/// every reader. All state shared between callers lives in the [`KeyStore`];
/// the instance itself only holds configuration, the loader and the tier-2
/// switch.
///
/// # Examples
///
/// ```
/// use cachemid_core::{BoxError, Cache, CacheConfig, Loaded, MemoryStore, Source};
///
/// let cache = Cache::builder()
///     .store(MemoryStore::new())
///     .loader(|dims: &[&str]| -> Result<Loaded, BoxError> {
///         Ok(format!("user {}", dims[0]).into())
///     })
///     .config(CacheConfig::new("users"))
///     .build()
///     .unwrap();
///
/// let first = cache.get(&["42"]).unwrap();
/// assert_eq!(first.value, "user 42");
/// assert_eq!(first.source, Source::Loader);
///
/// let second = cache.get(&["42"]).unwrap();
/// assert_eq!(second.source, Source::Tier1);
/// ```
pub struct Cache {
    store: Arc<dyn KeyStore>,
    locks: LockManager,
    loader: Option<Arc<dyn Loader>>,
    key_prefix: String,
    expire_time: Duration,
    cache2_enabled: AtomicBool,
    cache2_expire_time: Option<Duration>,
    lock_ttl: Duration,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl Cache {
    /// Returns an empty [`CacheBuilder`].
    pub fn builder() -> CacheBuilder {
        CacheBuilder::default()
    }

    /// Reads the value for `dimensions`, loading it on a miss.
    ///
    /// Dimension order is significant: the same values in a different order
    /// address a different entry.
    ///
    /// # Errors
    ///
    /// - [`Error::DataNotExist`] when tier-1 missed, another caller holds the
    ///   recomputation lock and tier-2 is disabled or empty.
    /// - [`Error::Loader`] when this caller ran the loader and it failed;
    ///   `stale` carries the tier-2 value if there was one.
    /// - [`Error::Store`] when the store failed; nothing is retried.
    pub fn get<S: AsRef<str>>(&self, dimensions: &[S]) -> Result<Lookup> {
        let dims: Vec<&str> = dimensions.iter().map(AsRef::as_ref).collect();

        #[cfg(feature = "stats")]
        self.stats.record_request();

        let tier1_key = self.key_for(&dims, Discriminator::Tier1);
        if let Some(value) = self.store.get(&tier1_key)? {
            debug!(prefix = %self.key_prefix, key = %tier1_key, tier = 1, "cache hit");
            #[cfg(feature = "stats")]
            self.stats.record_tier1_hit();
            return Ok(Lookup {
                value,
                source: Source::Tier1,
            });
        }

        let lock_key = self.key_for(&dims, Discriminator::Lock);
        if let Some(_guard) = self.locks.acquire(lock_key, self.lock_ttl)? {
            return self.load(&dims);
        }

        #[cfg(feature = "stats")]
        self.stats.record_lock_contended();

        if self.cache2_enabled() {
            let tier2_key = self.key_for(&dims, Discriminator::Tier2);
            if let Some(value) = self.store.get(&tier2_key)? {
                debug!(prefix = %self.key_prefix, key = %tier2_key, tier = 2, "lock contended, serving stale tier");
                #[cfg(feature = "stats")]
                self.stats.record_tier2_hit();
                return Ok(Lookup {
                    value,
                    source: Source::Tier2,
                });
            }
        }

        #[cfg(feature = "stats")]
        self.stats.record_miss();
        Err(Error::DataNotExist)
    }

    /// Runs the loader as lock owner and fills the tiers.
    fn load(&self, dims: &[&str]) -> Result<Lookup> {
        let Some(loader) = self.loader.as_ref() else {
            #[cfg(feature = "stats")]
            self.stats.record_miss();
            return Ok(Lookup {
                value: String::new(),
                source: Source::Loader,
            });
        };

        #[cfg(feature = "stats")]
        self.stats.record_load();
        let started = Instant::now();

        let Loaded { value, cache } = match loader.load(dims) {
            Ok(loaded) => loaded,
            Err(source) => {
                warn!(prefix = %self.key_prefix, error = %source, "loader failed");
                #[cfg(feature = "stats")]
                self.stats.record_load_failure();
                #[cfg(feature = "stats")]
                self.stats.record_miss();
                let stale = self.stale_value(dims);
                return Err(Error::Loader { source, stale });
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(prefix = %self.key_prefix, cached = cache, elapsed_ms, "loaded");

        if cache {
            self.store.set(
                &self.key_for(dims, Discriminator::Tier1),
                &value,
                Some(self.expire_time),
            )?;
            if self.cache2_enabled() {
                self.store.set(
                    &self.key_for(dims, Discriminator::Tier2),
                    &value,
                    self.cache2_expire_time,
                )?;
            }
        }

        Ok(Lookup {
            value,
            source: Source::Loader,
        })
    }

    /// Tier-2 value used as the fallback for a failed load.
    ///
    /// Read regardless of the tier-2 switch; a store error here is logged and
    /// treated as a miss so the loader error stays the reported cause.
    fn stale_value(&self, dims: &[&str]) -> Option<String> {
        let key = self.key_for(dims, Discriminator::Tier2);
        match self.store.get(&key) {
            Ok(stale) => stale,
            Err(error) => {
                warn!(prefix = %self.key_prefix, key = %key, tier = 2, %error, "fallback read failed");
                None
            }
        }
    }

    /// Deletes the tier-1 entry of `dimensions`.
    ///
    /// Tier-2 and any in-flight lock are left untouched, so stragglers keep
    /// being served stale data while the next reader reloads.
    pub fn del<S: AsRef<str>>(&self, dimensions: &[S]) -> Result<()> {
        self.store
            .delete(&self.key_for(dimensions, Discriminator::Tier1))
    }

    /// Deletes every store key starting with `prefix`.
    ///
    /// `prefix` is a raw store prefix; it is not scoped to this cache.
    pub fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        self.store.delete_by_prefix(prefix)
    }

    /// Deletes every entry and lock in this cache's namespace.
    ///
    /// Namespaces cannot nest, since a `key_prefix` never contains `':'`, so
    /// other caches sharing the store are left untouched.
    pub fn clear(&self) -> Result<()> {
        self.store
            .delete_by_prefix(&namespace_prefix(&self.key_prefix))
    }

    /// Turns tier-2 on or off. Safe to call while reads are in flight.
    pub fn set_cache2_enabled(&self, enabled: bool) {
        self.cache2_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether tier-2 is currently written and served.
    pub fn cache2_enabled(&self) -> bool {
        self.cache2_enabled.load(Ordering::Relaxed)
    }

    /// Takes the named lock `key` for at most `ttl`. See [`LockManager::try_lock`].
    pub fn lock(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.locks.try_lock(key, ttl)
    }

    /// Releases the named lock `key`, whoever holds it.
    pub fn unlock(&self, key: &str) -> Result<()> {
        self.locks.unlock(key)
    }

    /// The store key of `dimensions` for the given tier or lock.
    ///
    /// # Arguments
    ///
    /// * `dimensions` - The ordered dimension tuple
    /// * `discriminator` - Which of the tuple's three keys to derive
    ///
    /// # Examples
    ///
    /// ```
    /// use cachemid_core::{Cache, Discriminator, MemoryStore};
    ///
    /// let cache = Cache::builder()
    ///     .store(MemoryStore::new())
    ///     .key_prefix("users")
    ///     .build()
    ///     .unwrap();
    ///
    /// let lock = cache.key_for(&["42"], Discriminator::Lock);
    /// assert!(lock.starts_with("users:"));
    /// assert!(lock.ends_with(":lock"));
    /// ```
    pub fn key_for<S: AsRef<str>>(&self, dimensions: &[S], discriminator: Discriminator) -> String {
        derive_key(&self.key_prefix, dimensions, discriminator)
    }

    /// Namespace of every key this cache writes.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Tier-1 TTL, after replacing a configured zero by the default.
    pub fn expire_time(&self) -> Duration {
        self.expire_time
    }

    /// Tier-2 TTL; `None` means tier-2 entries never expire.
    pub fn cache2_expire_time(&self) -> Option<Duration> {
        self.cache2_expire_time
    }

    /// Upper bound on how long a recomputation lock is honored.
    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    /// The backing store, shared with the lock manager.
    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Live counters of this cache's read path.
    ///
    /// # Returns
    ///
    /// A reference to the atomics themselves; take a
    /// [`snapshot`](CacheStats::snapshot) for a consistent copy.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("store", &self.store.name())
            .field("key_prefix", &self.key_prefix)
            .field("expire_time", &self.expire_time)
            .field("cache2_enabled", &self.cache2_enabled())
            .field("cache2_expire_time", &self.cache2_expire_time)
            .field("lock_ttl", &self.lock_ttl)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

/// Assembles a [`Cache`].
///
/// A store is mandatory; the loader is optional but a cache without one can
/// only ever serve what other writers put in the store.
#[derive(Default)]
pub struct CacheBuilder {
    store: Option<Arc<dyn KeyStore>>,
    loader: Option<Arc<dyn Loader>>,
    config: CacheConfig,
}

impl CacheBuilder {
    /// Sets the store this cache reads, writes and locks through.
    ///
    /// Required. Use [`shared_store`](Self::shared_store) when several caches
    /// must see the same entries and locks.
    pub fn store<K: KeyStore + 'static>(mut self, store: K) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Uses a store that is already shared, e.g. by several caches.
    pub fn shared_store(mut self, store: Arc<dyn KeyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the loader run by the lock owner on a miss.
    ///
    /// Any `Fn(&[&str]) -> Result<Loaded, BoxError> + Send + Sync` qualifies.
    pub fn loader<L: Loader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Uses a loader that is already shared.
    pub fn shared_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replaces the whole configuration, including any prefix set before.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides only the namespace of the configuration.
    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.config.key_prefix = key_prefix.into();
        self
    }

    /// Validates the configuration, connects the store and builds the cache.
    ///
    /// # Errors
    ///
    /// [`Error::MissingStore`] without a store, [`Error::Config`] for an
    /// invalid configuration (see [`CacheConfig::validate`]), or whatever
    /// [`KeyStore::connect`] reports.
    pub fn build(self) -> Result<Cache> {
        let store = self.store.ok_or(Error::MissingStore)?;
        let mut config = self.config;
        config.validate()?;

        if config.normalize() {
            warn!(prefix = %config.key_prefix, "expire_time was zero, using the default");
        }
        if self.loader.is_none() {
            warn!(prefix = %config.key_prefix, "cache built without a loader, misses return empty values");
        }

        store.connect()?;
        debug!(prefix = %config.key_prefix, store = store.name(), "cache ready");

        Ok(Cache {
            locks: LockManager::new(Arc::clone(&store)),
            store,
            loader: self.loader,
            key_prefix: config.key_prefix,
            expire_time: config.expire_time,
            cache2_enabled: AtomicBool::new(config.cache2_enabled),
            cache2_expire_time: config.cache2_expire_time,
            lock_ttl: config.lock_ttl,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        })
    }
}
