//! Credential hashing
//!
//! Wraps bcrypt: adaptive, deliberately slow, cost embedded in the
//! self-describing hash. Verification cost dominates per-request expense
//! under this algorithm family, so comparison results are cached keyed
//! by `hash:password`; a cache hit returns the identical boolean the
//! uncached path would produce.

use std::time::Duration;

use tracing::error;

use crate::cache::TtlCache;
use crate::error::AuthError;

/// Produces and verifies bcrypt password hashes at a configured cost.
pub struct PasswordHasher {
    cost: u32,
    cache: TtlCache<String, bool>,
}

impl PasswordHasher {
    /// Create a hasher. A cost of 0 selects bcrypt's default cost.
    pub fn new(cost: u32, cache_ttl: Duration) -> Self {
        let cost = if cost == 0 { bcrypt::DEFAULT_COST } else { cost };
        Self {
            cost,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Hash a password at the configured cost.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost).map_err(|e| {
            error!(error = %e, "password hashing failed");
            AuthError::Internal("password hashing failed".to_string())
        })
    }

    /// Verify a password against a hash produced by [`Self::hash`].
    ///
    /// Hashes that bcrypt cannot parse verify as false rather than
    /// erroring.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let key = format!("{hash}:{password}");
        if let Some(matched) = self.cache.get(&key) {
            return matched;
        }

        let matched = bcrypt::verify(password, hash).unwrap_or(false);
        self.cache.insert(key, matched);
        matched
    }

    /// Configured bcrypt cost.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub(crate) fn sweep_cache(&self) {
        self.cache.sweep();
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The lowest cost bcrypt accepts, to keep the adaptive hash fast
    // enough for unit tests; production deployments tune this upward
    // (12 is a sane default).
    const TEST_COST: u32 = 4;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(TEST_COST, Duration::from_secs(60))
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("myStrongP@ssw0rd").unwrap();

        assert!(hasher.verify("myStrongP@ssw0rd", &hash));
        assert!(!hasher.verify("wrongpassword", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same-password", &a));
        assert!(hasher.verify("same-password", &b));
    }

    #[test]
    fn test_cached_result_matches_uncached() {
        let hasher = hasher();
        let hash = hasher.hash("pw").unwrap();

        let cold = hasher.verify("pw", &hash);
        let warm = hasher.verify("pw", &hash);
        assert_eq!(cold, warm);

        hasher.clear_cache();
        assert_eq!(hasher.verify("pw", &hash), cold);

        // Negative results are cached with the same fidelity.
        assert!(!hasher.verify("nope", &hash));
        assert!(!hasher.verify("nope", &hash));
    }

    #[test]
    fn test_garbage_hash_verifies_false() {
        let hasher = hasher();
        assert!(!hasher.verify("pw", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_zero_cost_selects_default() {
        let hasher = PasswordHasher::new(0, Duration::from_secs(60));
        assert_eq!(hasher.cost(), bcrypt::DEFAULT_COST);
    }
}
