//! Error types shared by the cache, the lock manager and every store adapter.

use thiserror::Error;

/// Boxed error returned by loaders and carried as the source of store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by cache reads, invalidation and construction.
#[derive(Error, Debug)]
pub enum Error {
    /// Nothing could be served: tier-1 missed and another caller holds the
    /// recomputation lock, with no usable tier-2 value.
    #[error("data not exist")]
    DataNotExist,

    /// The loader failed.
    ///
    /// `stale` holds the tier-2 value when one was available. A caller that
    /// receives this variant with `stale` set got a degraded but usable answer.
    #[error("loader failed: {source}")]
    Loader {
        #[source]
        source: BoxError,
        stale: Option<String>,
    },

    /// The backing store failed on a read or write.
    #[error("{backend} store error: {message}")]
    Store {
        backend: &'static str,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The cache was built without a store adapter.
    #[error("a cache requires a key store")]
    MissingStore,

    /// Invalid configuration detected at construction.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds a [`Error::Store`] wrapping the adapter's own error.
    pub fn store<E>(backend: &'static str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            backend,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The stale tier-2 value paired with a loader failure, if any.
    pub fn stale_value(&self) -> Option<&str> {
        match self {
            Error::Loader { stale, .. } => stale.as_deref(),
            _ => None,
        }
    }

    /// Returns true for [`Error::DataNotExist`].
    pub fn is_data_not_exist(&self) -> bool {
        matches!(self, Error::DataNotExist)
    }

    /// Returns true for [`Error::Store`].
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_stale_value_only_on_loader_error() {
        let err = Error::Loader {
            source: "source down".into(),
            stale: Some("old".to_string()),
        };
        assert_eq!(err.stale_value(), Some("old"));
        assert_eq!(Error::DataNotExist.stale_value(), None);
    }

    #[test]
    fn test_store_error_keeps_source() {
        let err = Error::store(
            "memory",
            "write failed",
            io::Error::new(io::ErrorKind::Other, "disk"),
        );
        assert!(err.is_store());
        assert_eq!(err.to_string(), "memory store error: write failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_data_not_exist_message() {
        assert!(Error::DataNotExist.is_data_not_exist());
        assert_eq!(Error::DataNotExist.to_string(), "data not exist");
    }
}
