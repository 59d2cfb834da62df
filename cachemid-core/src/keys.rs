//! Store key derivation.
//!
//! Every dimension tuple owns three store keys inside a cache namespace: the
//! tier-1 entry, the tier-2 entry and the recomputation lock. The key shape is
//!
//! ```text
//! {prefix}:{sha256(framed dimensions + discriminator)}:{tag}
//! ```
//!
//! so keys stay bounded no matter how many dimensions a caller passes or how
//! long they are, and they never contain caller-supplied bytes beyond the
//! prefix.
//!
//! Dimension order is significant: `["user", "42"]` and `["42", "user"]`
//! address different entries.

use sha2::{Digest, Sha256};
use std::fmt;

/// Selects which of the three keys of a dimension tuple is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Discriminator {
    /// Primary, short-lived entry.
    Tier1,
    /// Long-lived stale fallback entry.
    Tier2,
    /// Recomputation lock.
    Lock,
}

impl Discriminator {
    /// The tag appended to the derived key and mixed into the digest.
    pub fn tag(self) -> &'static str {
        match self {
            Discriminator::Tier1 => "1",
            Discriminator::Tier2 => "2",
            Discriminator::Lock => "lock",
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Derives the store key for `dimensions` under `prefix`.
///
/// Pure and infallible: empty prefixes and empty dimension lists are valid.
///
/// # Examples
///
/// ```
/// use cachemid_core::{derive_key, Discriminator};
///
/// let tier1 = derive_key("users", &["42"], Discriminator::Tier1);
/// let tier2 = derive_key("users", &["42"], Discriminator::Tier2);
///
/// assert!(tier1.starts_with("users:"));
/// assert!(tier1.ends_with(":1"));
/// assert_ne!(tier1, tier2);
/// assert_eq!(tier1, derive_key("users", &["42"], Discriminator::Tier1));
/// ```
pub fn derive_key<S: AsRef<str>>(
    prefix: &str,
    dimensions: &[S],
    discriminator: Discriminator,
) -> String {
    let digest = digest_dimensions(dimensions, discriminator);
    format!("{}:{}:{}", prefix, digest, discriminator.tag())
}

/// Hex SHA-256 over the length-framed dimensions followed by the discriminator.
///
/// Each dimension is written as `{byte_len}:{bytes};` so that no two distinct
/// tuples produce the same digest input (`["a;b"]` vs `["a", "b"]`).
fn digest_dimensions<S: AsRef<str>>(dimensions: &[S], discriminator: Discriminator) -> String {
    let mut hasher = Sha256::new();
    for dimension in dimensions {
        let dimension = dimension.as_ref();
        hasher.update(dimension.len().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(dimension.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"#");
    hasher.update(discriminator.tag().as_bytes());
    hex::encode(hasher.finalize())
}

/// Prefix shared by every key of the namespace `prefix`.
pub fn namespace_prefix(prefix: &str) -> String {
    format!("{}:", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Discriminator; 3] = [
        Discriminator::Tier1,
        Discriminator::Tier2,
        Discriminator::Lock,
    ];

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key("orders", &["eu", "2024"], Discriminator::Tier1);
        let b = derive_key("orders", &["eu", "2024"], Discriminator::Tier1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_discriminators_never_collide() {
        let keys: Vec<String> = ALL
            .iter()
            .map(|d| derive_key("orders", &["eu"], *d))
            .collect();
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_ne!(keys[1], keys[2]);
    }

    #[test]
    fn test_discriminator_changes_digest_not_only_tag() {
        let tier1 = derive_key("p", &["x"], Discriminator::Tier1);
        let tier2 = derive_key("p", &["x"], Discriminator::Tier2);
        let digest1 = tier1.split(':').nth(1).unwrap();
        let digest2 = tier2.split(':').nth(1).unwrap();
        assert_ne!(digest1, digest2);
    }

    #[test]
    fn test_order_is_significant() {
        let ab = derive_key("p", &["a", "b"], Discriminator::Tier1);
        let ba = derive_key("p", &["b", "a"], Discriminator::Tier1);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_framing_separates_joined_values() {
        let joined = derive_key("p", &["a_b"], Discriminator::Tier1);
        let split = derive_key("p", &["a", "b"], Discriminator::Tier1);
        assert_ne!(joined, split);

        let trailing_empty = derive_key("p", &["a", ""], Discriminator::Tier1);
        let single = derive_key("p", &["a"], Discriminator::Tier1);
        assert_ne!(trailing_empty, single);
    }

    #[test]
    fn test_empty_inputs_are_valid() {
        let empty: [&str; 0] = [];
        let key = derive_key("", &empty, Discriminator::Lock);
        assert!(key.starts_with(':'));
        assert!(key.ends_with(":lock"));
        assert_ne!(key, derive_key("", &[""], Discriminator::Lock));
    }

    #[test]
    fn test_key_length_is_bounded() {
        let long = "x".repeat(100_000);
        let many: Vec<String> = (0..1_000).map(|i| i.to_string()).collect();

        let short_key = derive_key("p", &["a"], Discriminator::Tier1);
        let long_key = derive_key("p", &[long.as_str()], Discriminator::Tier1);
        let many_key = derive_key("p", &many, Discriminator::Tier1);

        assert_eq!(short_key.len(), long_key.len());
        assert_eq!(short_key.len(), many_key.len());
        // "p" + ":" + 64 hex chars + ":" + "1"
        assert_eq!(short_key.len(), 1 + 1 + 64 + 1 + 1);
    }

    #[test]
    fn test_keys_share_namespace_prefix() {
        let ns = namespace_prefix("orders");
        for d in ALL {
            assert!(derive_key("orders", &["eu"], d).starts_with(&ns));
        }
    }
}
