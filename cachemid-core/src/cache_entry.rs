use std::time::{Duration, Instant};

/// A value held by [`MemoryStore`](crate::MemoryStore) together with its deadline.
///
/// Expiry is evaluated lazily: an entry past its deadline is treated as absent
/// by every read and by `set_if_absent`, and is physically removed on the next
/// access or by [`MemoryStore::purge_expired`](crate::MemoryStore::purge_expired).
///
/// # Examples
///
/// ```
/// use cachemid_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new("data".to_string(), Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, "data");
/// assert!(!entry.is_expired());
///
/// // No TTL means never expires
/// let pinned = CacheEntry::new("data".to_string(), None);
/// assert!(pinned.expires_at.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// When the entry was written
    pub inserted_at: Instant,
    /// Deadline after which the entry reads as absent; `None` never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Creates an entry stamped with `Instant::now()`.
    ///
    /// `ttl` must already be normalized (see [`effective_ttl`](crate::effective_ttl)):
    /// `None` pins the entry.
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        let inserted_at = Instant::now();
        Self {
            value,
            inserted_at,
            expires_at: ttl.map(|ttl| inserted_at + ttl),
        }
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }

    /// Time left before expiry, `None` for pinned entries.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
