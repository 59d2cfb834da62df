//! The application-supplied data source.
//!
//! A loader is invoked by the single caller that wins the recomputation lock
//! for a dimension tuple. It may still run concurrently for *different*
//! tuples, hence the `Send + Sync` bound.

use crate::error::BoxError;

/// A freshly loaded value and whether it may be written to the cache tiers.
///
/// # Examples
///
/// ```
/// use cachemid_core::Loaded;
///
/// let hit = Loaded::new("alice");
/// assert!(hit.cache);
///
/// // "not found" answers the loader does not want pinned
/// let absent = Loaded::transient("");
/// assert!(!absent.cache);
///
/// let from_string: Loaded = String::from("bob").into();
/// assert!(from_string.cache);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loaded {
    pub value: String,
    pub cache: bool,
}

impl Loaded {
    /// A value that is written to tier-1 (and tier-2 when enabled).
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cache: true,
        }
    }

    /// A value returned to the caller but never written to either tier.
    pub fn transient(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cache: false,
        }
    }
}

impl From<String> for Loaded {
    fn from(value: String) -> Self {
        Loaded::new(value)
    }
}

impl From<&str> for Loaded {
    fn from(value: &str) -> Self {
        Loaded::new(value)
    }
}

/// Produces the value for a dimension tuple on a cache miss.
///
/// An `Err` signals that the source is unavailable; the cache then tries to
/// serve the tier-2 value instead. Absent data is not an error: return
/// [`Loaded::transient`] to skip caching it, or [`Loaded::new`] to pin it.
///
/// Any `Fn(&[&str]) -> Result<Loaded, BoxError> + Send + Sync` is a loader.
pub trait Loader: Send + Sync {
    fn load(&self, dimensions: &[&str]) -> Result<Loaded, BoxError>;
}

impl<F> Loader for F
where
    F: Fn(&[&str]) -> Result<Loaded, BoxError> + Send + Sync,
{
    fn load(&self, dimensions: &[&str]) -> Result<Loaded, BoxError> {
        self(dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_loader() {
        let loader = |dims: &[&str]| -> Result<Loaded, BoxError> { Ok(dims.join("-").into()) };
        let loaded = loader.load(&["a", "b"]).unwrap();
        assert_eq!(loaded, Loaded::new("a-b"));
    }

    #[test]
    fn test_closure_error_propagates() {
        let loader = |_: &[&str]| -> Result<Loaded, BoxError> { Err("source down".into()) };
        let err = loader.load(&[]).unwrap_err();
        assert_eq!(err.to_string(), "source down");
    }

    #[test]
    fn test_transient_is_not_cached() {
        let loaded = Loaded::transient("x");
        assert_eq!(loaded.value, "x");
        assert!(!loaded.cache);
    }
}
