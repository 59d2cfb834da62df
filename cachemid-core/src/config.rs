use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default tier-1 TTL.
pub const DEFAULT_EXPIRE_TIME: Duration = Duration::from_secs(10);

/// Default lifetime of a recomputation lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Configuration of a [`Cache`](crate::Cache).
///
/// # Examples
///
/// ```
/// use cachemid_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::new("users")
///     .with_expire_time(Duration::from_secs(30))
///     .with_cache2_expire_time(Some(Duration::from_secs(3600)));
///
/// assert_eq!(config.key_prefix, "users");
/// assert!(config.cache2_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace of every key this cache writes. Must not contain `':'`,
    /// which separates the namespace from the rest of a store key.
    pub key_prefix: String,
    /// Tier-1 TTL. A zero value is replaced by [`DEFAULT_EXPIRE_TIME`].
    pub expire_time: Duration,
    /// Whether tier-2 is written on load and read by lock losers.
    pub cache2_enabled: bool,
    /// Tier-2 TTL. `None` or zero means the entry never expires.
    pub cache2_expire_time: Option<Duration>,
    /// Maximum time a recomputation lock is honored.
    pub lock_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            expire_time: DEFAULT_EXPIRE_TIME,
            cache2_enabled: true,
            cache2_expire_time: None,
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }
}

impl CacheConfig {
    /// Default configuration under the namespace `key_prefix`.
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Self::default()
        }
    }

    /// Set the tier-1 TTL.
    pub fn with_expire_time(mut self, ttl: Duration) -> Self {
        self.expire_time = ttl;
        self
    }

    /// Enable or disable tier-2.
    pub fn with_cache2(mut self, enabled: bool) -> Self {
        self.cache2_enabled = enabled;
        self
    }

    /// Set the tier-2 TTL (`None` = never expire).
    pub fn with_cache2_expire_time(mut self, ttl: Option<Duration>) -> Self {
        self.cache2_expire_time = ttl;
        self
    }

    /// Set the recomputation lock TTL.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Rejects settings the cache cannot run with.
    ///
    /// A zero lock TTL would create locks that never expire, so a crashed
    /// holder would block recomputation of its tuple forever. A `key_prefix`
    /// containing `':'` would nest inside another namespace (`users:eu` under
    /// `users`), and purging the outer one would wipe the inner one too.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.lock_ttl.is_zero() {
            return Err(Error::Config("lock_ttl must be positive".to_string()));
        }
        if self.key_prefix.contains(':') {
            return Err(Error::Config(format!(
                "key_prefix {:?} must not contain ':'",
                self.key_prefix
            )));
        }
        Ok(())
    }

    /// Replaces a zero tier-1 TTL by the default. Returns true if it did.
    pub(crate) fn normalize(&mut self) -> bool {
        if self.expire_time.is_zero() {
            self.expire_time = DEFAULT_EXPIRE_TIME;
            return true;
        }
        false
    }
}
