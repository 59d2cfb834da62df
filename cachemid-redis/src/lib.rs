//! # Cachemid Redis
//!
//! A [`KeyStore`] backed by Redis, so tier entries and recomputation locks are
//! shared by every process pointing at the same server. With this store at
//! most one process runs the loader for a dimension tuple per lock window.
//!
//! Locks rely on `SET key value NX PX ttl`, which Redis executes atomically.
//! Prefix deletion walks the keyspace with `SCAN MATCH` (never `KEYS`) and
//! deletes each batch.
//!
//! ## Example
//!
//! ```ignore
//! use cachemid_core::{Cache, CacheConfig};
//! use cachemid_redis::{RedisConfig, RedisStore};
//!
//! let store = RedisStore::new(RedisConfig::from_env())?;
//! let cache = Cache::builder()
//!     .store(store)
//!     .loader(load_user)
//!     .config(CacheConfig::new("users"))
//!     .build()?; // connects and PINGs
//! ```

use std::time::Duration;

use cachemid_core::{effective_ttl, Error, KeyStore, Result};
use parking_lot::Mutex;
use redis::{Client, Connection, RedisResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

const BACKEND: &str = "redis";

/// Default server address.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://:password@host:6379/0`).
    pub url: String,
    /// `COUNT` hint passed to each `SCAN` during prefix deletion.
    pub scan_count: usize,
    /// Timeout for establishing a connection; `None` blocks indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            scan_count: 500,
            connect_timeout: Some(Duration::from_secs(2)),
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the URL taken from `REDIS_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var("REDIS_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Redis implementation of [`KeyStore`].
///
/// Holds one synchronous connection, opened by [`KeyStore::connect`] or
/// lazily on first use. A command that fails drops the connection and the
/// next command reconnects; the failure itself is reported, not retried.
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    conn: Mutex<Option<Connection>>,
}

impl RedisStore {
    /// Creates the client. No connection is made until first use.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| Error::store(BACKEND, "failed to create client", e))?;
        Ok(Self {
            client,
            config,
            conn: Mutex::new(None),
        })
    }

    /// Shorthand for [`RedisStore::new`] with default settings and `url`.
    pub fn with_url(url: &str) -> Result<Self> {
        Self::new(RedisConfig::new(url))
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn open(&self) -> Result<Connection> {
        let conn = match self.config.connect_timeout {
            Some(timeout) => self.client.get_connection_with_timeout(timeout),
            None => self.client.get_connection(),
        };
        conn.map_err(|e| Error::store(BACKEND, "failed to connect", e))
    }

    /// Runs `command` on the shared connection, reconnecting if there is none.
    fn run<T>(
        &self,
        op: &'static str,
        command: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Result<T> {
        let mut slot = self.conn.lock();
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.open()?,
        };
        match command(&mut conn) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            Err(e) => Err(Error::store(BACKEND, format!("{} failed", op), e)),
        }
    }
}

impl KeyStore for RedisStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn connect(&self) -> Result<()> {
        let pong: String = self.run("PING", |conn| redis::cmd("PING").query(conn))?;
        debug!(url = %redacted(&self.config.url), %pong, "redis connected");
        Ok(())
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = effective_ttl(ttl) {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        self.run("SET", |conn| cmd.query::<()>(conn))
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = effective_ttl(ttl) {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        // Reply is OK when the key was set and nil when it already existed.
        let reply: Option<String> = self.run("SET NX", |conn| cmd.query(conn))?;
        Ok(reply.is_some())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.run("GET", |conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.run("DEL", |conn| redis::cmd("DEL").arg(key).query::<i64>(conn))
            .map(|_| ())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        let pattern = format!("{}*", escape_glob(prefix));
        let count = self.config.scan_count.max(1);
        let mut cursor: u64 = 0;
        let mut deleted: i64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = self.run("SCAN", |conn| {
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query(conn)
            })?;
            if !keys.is_empty() {
                deleted += self.run("DEL", |conn| redis::cmd("DEL").arg(&keys).query::<i64>(conn))?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!(prefix, deleted, "deleted keys by prefix");
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &redacted(&self.config.url))
            .field("scan_count", &self.config.scan_count)
            .field("connected", &self.conn.lock().is_some())
            .finish()
    }
}

/// Milliseconds for `PX`, at least 1 so sub-millisecond TTLs still expire.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Escapes the glob metacharacters `SCAN MATCH` understands.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The URL with any password replaced, for logs.
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("users:"), "users:");
        assert_eq!(escape_glob("a*b?c"), "a\\*b\\?c");
        assert_eq!(escape_glob("[x]\\"), "\\[x\\]\\\\");
    }

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(10)), 10_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
    }

    #[test]
    fn test_redacted() {
        assert_eq!(
            redacted("redis://:secret@cache:6379/0"),
            "redis://***@cache:6379/0"
        );
        assert_eq!(redacted("redis://localhost:6379"), "redis://localhost:6379");
    }

    #[test]
    fn test_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, DEFAULT_REDIS_URL);
        assert_eq!(config.scan_count, 500);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_new_does_not_connect() {
        // Nothing listens on port 1; creating the client must still succeed.
        let store = RedisStore::with_url("redis://127.0.0.1:1").unwrap();
        assert_eq!(store.name(), "redis");
        assert!(!format!("{:?}", store).contains("connected: true"));
    }

    #[test]
    fn test_invalid_url_is_store_error() {
        let err = RedisStore::with_url("not a url").unwrap_err();
        assert!(err.is_store());
    }
}
