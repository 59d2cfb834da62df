use std::sync::atomic::{AtomicU64, Ordering};

/// Read-path statistics of a [`Cache`](crate::Cache).
///
/// Every `Cache::get` call records exactly one request and at most one of
/// `tier1_hits`, `tier2_hits` and `misses`. A call that runs the loader also
/// records a load, plus a load failure if the loader errors. A failed load
/// counts as a miss even when the error carries a stale tier-2 value, so
/// [`hit_rate`](CacheStats::hit_rate) only reflects requests answered with
/// `Ok`.
///
/// All counters are atomic with `Relaxed` ordering: they are cheap to update
/// from many threads and consistent per counter, but a
/// [`snapshot`](CacheStats::snapshot) taken during traffic may mix slightly
/// different instants.
///
/// # Examples
///
/// ```
/// use cachemid_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_request();
/// stats.record_tier1_hit();
/// stats.record_request();
/// stats.record_lock_contended();
/// stats.record_miss();
///
/// assert_eq!(stats.requests(), 2);
/// assert_eq!(stats.hits(), 1);
/// assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    requests: AtomicU64,
    tier1_hits: AtomicU64,
    tier2_hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    lock_contended: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub tier1_hits: u64,
    pub tier2_hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub lock_contended: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            tier1_hits: AtomicU64::new(0),
            tier2_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            lock_contended: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tier1_hit(&self) {
        self.tier1_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A value served from tier-2 to a caller that lost the recomputation lock.
    #[inline]
    pub fn record_tier2_hit(&self) {
        self.tier2_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A request that returned `DataNotExist`, a failed load, or an empty
    /// value because no loader is configured.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lock_contended(&self) {
        self.lock_contended.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn tier1_hits(&self) -> u64 {
        self.tier1_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn tier2_hits(&self) -> u64 {
        self.tier2_hits.load(Ordering::Relaxed)
    }

    /// Requests served from either tier.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.tier1_hits() + self.tier2_hits()
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Loader invocations.
    #[inline]
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn load_failures(&self) -> u64 {
        self.load_failures.load(Ordering::Relaxed)
    }

    /// Requests that missed tier-1 and lost the recomputation lock.
    #[inline]
    pub fn lock_contended(&self) -> u64 {
        self.lock_contended.load(Ordering::Relaxed)
    }

    /// Fraction of requests served from a cache tier (0.0 with no requests).
    pub fn hit_rate(&self) -> f64 {
        let total = self.requests();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests(),
            tier1_hits: self.tier1_hits(),
            tier2_hits: self.tier2_hits(),
            misses: self.misses(),
            loads: self.loads(),
            load_failures: self.load_failures(),
            lock_contended: self.lock_contended(),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.tier1_hits.store(0, Ordering::Relaxed);
        self.tier2_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        self.load_failures.store(0, Ordering::Relaxed);
        self.lock_contended.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}
