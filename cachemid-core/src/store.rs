//! The capability every backing key-value store must provide.
//!
//! The cache never talks to a store other than through [`KeyStore`]. The store
//! is the only shared mutable state between concurrent callers and, when it is
//! networked, between processes. Mutual exclusion of recomputations rests
//! entirely on [`KeyStore::set_if_absent`] being atomic at the store.

use std::time::Duration;

use crate::error::Result;

/// Point lookups, expiring writes and atomic create-if-missing over string keys.
///
/// A `ttl` of `None` or [`Duration::ZERO`] means the entry never expires.
///
/// Implementations must be safe to share across threads; every method may be
/// called concurrently.
pub trait KeyStore: Send + Sync {
    /// Short adapter name used in logs and [`Error::Store`](crate::Error::Store).
    fn name(&self) -> &'static str;

    /// Idempotent setup, invoked once when a cache is built.
    ///
    /// In-process stores have nothing to do.
    fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Unconditional upsert with expiry.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Creates the entry only if no live entry exists under `key`.
    ///
    /// Returns `true` iff this call created it. Must be atomic.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Returns the live value under `key`, or `None` on a miss.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Removes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Removes every key starting with `prefix`.
    fn delete_by_prefix(&self, prefix: &str) -> Result<()>;
}

/// Normalizes a TTL: `None` for "never expires", `Some(d)` with `d > 0` otherwise.
pub fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero())
}

impl<T: KeyStore + ?Sized> KeyStore for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn connect(&self) -> Result<()> {
        (**self).connect()
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        (**self).set(key, value, ttl)
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        (**self).delete_by_prefix(prefix)
    }
}
