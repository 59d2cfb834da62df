//! # Cachemid
//!
//! Read-through caching middleware that keeps a slow data source from being
//! hammered when a popular entry expires.
//!
//! ## Features
//!
//! - **Stampede protection**: on a miss only the caller holding the
//!   recomputation lock runs the loader; everyone else is answered without it
//! - **Stale fallback**: a long-lived second tier serves lock losers and
//!   callers whose load failed
//! - **Distributed locks**: locks live in the same store as the data, so a
//!   shared store (Redis) protects the source across processes
//! - **Pluggable stores**: anything implementing [`KeyStore`] works; an
//!   in-memory store ships with the crate, Redis behind the `redis` feature
//! - **Statistics**: hit, miss and load counters behind the `stats` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use cachemid::prelude::*;
//! use std::time::Duration;
//!
//! let cache = Cache::builder()
//!     .store(MemoryStore::new())
//!     .loader(|dims: &[&str]| -> Result<Loaded, BoxError> {
//!         // Query the database, call a service, ...
//!         Ok(Loaded::new(format!("profile of {}", dims[0])))
//!     })
//!     .config(
//!         CacheConfig::new("profiles")
//!             .with_expire_time(Duration::from_secs(30))
//!             .with_lock_ttl(Duration::from_secs(5)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let lookup = cache.get(&["alice"]).unwrap();
//! assert_eq!(lookup.value, "profile of alice");
//! assert_eq!(cache.get(&["alice"]).unwrap().source, Source::Tier1);
//! ```
//!
//! ## Handling Misses
//!
//! A caller that finds neither tier populated while someone else is loading
//! gets [`Error::DataNotExist`]. A failed load carries the stale tier-2 value,
//! if any, so callers can decide whether old data beats no data:
//!
//! ```rust
//! use cachemid::prelude::*;
//!
//! # let cache = Cache::builder()
//! #     .store(MemoryStore::new())
//! #     .loader(|_: &[&str]| -> Result<Loaded, BoxError> { Err("database down".into()) })
//! #     .build()
//! #     .unwrap();
//! let value = match cache.get(&["alice"]) {
//!     Ok(lookup) => Some(lookup.value),
//!     Err(err @ Error::Loader { .. }) => err.stale_value().map(str::to_string),
//!     Err(Error::DataNotExist) => None,
//!     Err(err) => panic!("cache failed: {err}"),
//! };
//! assert_eq!(value, None);
//! ```
//!
//! ## Redis
//!
//! With the `redis` feature enabled, [`RedisStore`] shares entries and locks
//! between processes:
//!
//! ```ignore
//! use cachemid::{Cache, CacheConfig, RedisConfig, RedisStore};
//!
//! let cache = Cache::builder()
//!     .store(RedisStore::new(RedisConfig::from_env())?)
//!     .loader(load_profile)
//!     .config(CacheConfig::new("profiles"))
//!     .build()?;
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `debug` for
//! hits, lock contention and releases, `info` for completed loads, `warn` for
//! failed loads and failed lock releases. Install any subscriber to see them.

pub use cachemid_core::*;

#[cfg(feature = "redis")]
pub use cachemid_redis::{RedisConfig, RedisStore, DEFAULT_REDIS_URL};

/// The types most callers need.
pub mod prelude {
    pub use cachemid_core::{
        BoxError, Cache, CacheBuilder, CacheConfig, Error, KeyStore, Loaded, Loader, Lookup,
        MemoryStore, Source,
    };

    #[cfg(feature = "redis")]
    pub use cachemid_redis::{RedisConfig, RedisStore};
}
