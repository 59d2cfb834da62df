//! Advisory recomputation locks with a hard timeout.
//!
//! A lock is a store entry holding the sentinel `"1"` created with
//! [`KeyStore::set_if_absent`]. Whoever creates the entry holds the lock until
//! it is released or until its TTL elapses, whichever comes first. The TTL is
//! the only protection against a holder that crashes or stalls.
//!
//! Release is unconditional: any caller that knows the key may delete the
//! entry. There is no ownership token, so a holder that outlives its TTL can
//! release a lock that a later caller has since acquired.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::KeyStore;

/// Value written under every lock key.
pub const LOCK_SENTINEL: &str = "1";

/// Acquires and releases named locks on a shared [`KeyStore`].
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn KeyStore>,
}

impl LockManager {
    /// Creates a lock manager over `store`.
    ///
    /// Locks are only exclusive between managers that share the same store.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Tries to take the lock at `key` for at most `ttl`.
    ///
    /// Returns `Ok(true)` iff this call created the lock entry. A zero `ttl`
    /// creates a lock that never expires on its own.
    pub fn try_lock(&self, key: &str, ttl: Duration) -> Result<bool> {
        let acquired = self.store.set_if_absent(key, LOCK_SENTINEL, Some(ttl))?;
        if !acquired {
            debug!(key, "lock held elsewhere");
        }
        Ok(acquired)
    }

    /// Deletes the lock entry at `key`, whoever holds it.
    pub fn unlock(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    /// Like [`try_lock`](Self::try_lock), but returns a guard that releases
    /// the lock when dropped, including during a panic unwind.
    pub(crate) fn acquire(&self, key: String, ttl: Duration) -> Result<Option<LockGuard<'_>>> {
        if self.try_lock(&key, ttl)? {
            Ok(Some(LockGuard { manager: self, key }))
        } else {
            Ok(None)
        }
    }
}

/// Held recomputation lock; deleted from the store on drop.
///
/// A failed delete is logged rather than reported: the caller already has a
/// result to return and the lock self-expires after its TTL.
pub(crate) struct LockGuard<'a> {
    manager: &'a LockManager,
    key: String,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        match self.manager.unlock(&self.key) {
            Ok(()) => debug!(key = %self.key, "lock released"),
            Err(error) => warn!(key = %self.key, %error, "failed to release lock, waiting for expiry"),
        }
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("store", &self.store.name())
            .finish()
    }
}
