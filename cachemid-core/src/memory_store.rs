use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::store::{effective_ttl, KeyStore};
use crate::CacheEntry;

/// In-process expiring map implementing [`KeyStore`].
///
/// Backed by a sharded [`DashMap`], so reads of different keys do not contend
/// and `set_if_absent` is atomic per key through the map's entry API. Locks
/// taken through this store only exclude callers of the same process.
///
/// # Expiry
///
/// Entries carry their own deadline. An expired entry is invisible to `get`
/// and is replaced by `set_if_absent` as if it were absent. Expired entries are
/// removed lazily on access; call [`MemoryStore::purge_expired`] periodically
/// to reclaim memory held by keys that are never read again.
///
/// # Examples
///
/// ```
/// use cachemid_core::{KeyStore, MemoryStore};
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// assert!(store.set_if_absent("lock", "1", Some(Duration::from_secs(10))).unwrap());
/// assert!(!store.set_if_absent("lock", "1", Some(Duration::from_secs(10))).unwrap());
///
/// store.set("user:1", "alice", None).unwrap();
/// assert_eq!(store.get("user:1").unwrap().as_deref(), Some("alice"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store sized for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity(capacity),
        }
    }

    /// Removes every expired entry.
    ///
    /// Reads already skip expired entries; this only reclaims memory held by
    /// keys nobody reads again.
    ///
    /// # Returns
    ///
    /// The number of entries dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired_at(now));
        before.saturating_sub(self.map.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Time left before `key` expires.
    ///
    /// Outer `None` on a miss; inner `None` for an entry that never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let entry = self.map.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.remaining())
    }
}

impl KeyStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.map.insert(
            key.to_string(),
            CacheEntry::new(value.to_string(), effective_ttl(ttl)),
        );
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        // The entry guard holds the shard write lock for the whole check-and-insert.
        match self.map.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(CacheEntry::new(value.to_string(), effective_ttl(ttl)));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value.to_string(), effective_ttl(ttl)));
                Ok(true)
            }
        }
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let expired = match self.map.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        }; // read guard released here

        if expired {
            self.map.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        self.map.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
