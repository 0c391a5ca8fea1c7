//! Configuration for the access-control core

use std::time::Duration;

/// Tunables for tokens, rotation, hashing, and the caches.
///
/// The initial signing secret and the policy set are not part of this
/// struct; they come from the host's [`crate::source::SecretSource`] and
/// [`crate::source::PolicySource`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Period of the background secret rotation; `None` disables it
    pub rotation_period: Option<Duration>,
    /// How many retired secrets stay verifiable after rotation
    pub retired_capacity: usize,
    /// bcrypt cost; 0 selects the bcrypt default
    pub bcrypt_cost: u32,
    /// TTL of the token-validation cache (independent of token expiry)
    pub token_cache_ttl: Duration,
    /// TTL of the password-check cache
    pub password_cache_ttl: Duration,
    /// TTL of the authorization-decision cache
    pub decision_cache_ttl: Duration,
    /// Period of the background cache sweep
    pub sweep_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(15 * 60),
            rotation_period: None,
            retired_capacity: 2,
            bcrypt_cost: 0,
            token_cache_ttl: Duration::from_secs(60),
            password_cache_ttl: Duration::from_secs(5 * 60),
            decision_cache_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token lifetime.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Enable timed secret rotation.
    #[must_use]
    pub fn with_rotation_period(mut self, period: Duration) -> Self {
        self.rotation_period = Some(period);
        self
    }

    /// Set how many retired secrets stay verifiable.
    #[must_use]
    pub fn with_retired_capacity(mut self, capacity: usize) -> Self {
        self.retired_capacity = capacity;
        self
    }

    /// Set the bcrypt cost.
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Set one TTL for all three caches.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.token_cache_ttl = ttl;
        self.password_cache_ttl = ttl;
        self.decision_cache_ttl = ttl;
        self
    }

    /// Set the background sweep period.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
