//! Token issuance and validation against the secret ring
//!
//! Tokens are standard three-part HS256 JWTs whose payload carries
//! exactly the [`Claims`] fields. Validation tries the current secret
//! first, then each retired secret from most- to least-recently retired;
//! successful validations are cached keyed by the raw token string.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::cache::TtlCache;
use crate::error::AuthError;
use crate::secrets::SecretRing;

/// Authenticated identity carried inside a signed token.
///
/// Immutable once issued; attached read-only to the request context for
/// the remainder of its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id of the authenticated user
    pub user_id: i64,
    /// Username at issue time
    pub username: String,
    /// Role name resolved against the policy set
    pub role: String,
    /// Absolute expiry, seconds since the Unix epoch
    pub exp: i64,
}

impl Claims {
    /// Whether the embedded expiry has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Issues and validates signed tokens against the rotating secret ring.
pub struct TokenService {
    ring: RwLock<SecretRing>,
    token_ttl: Duration,
    cache: TtlCache<String, Claims>,
}

impl TokenService {
    /// Create a service from the initial signing secret.
    ///
    /// `retired_capacity` bounds how many retired secrets stay
    /// verifiable; `cache_ttl` governs the token-validation cache and is
    /// independent of the tokens' own expiry.
    pub fn new(
        initial_secret: impl Into<Vec<u8>>,
        retired_capacity: usize,
        token_ttl: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            ring: RwLock::new(SecretRing::new(initial_secret, retired_capacity)),
            token_ttl,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Issue a signed token for the subject.
    ///
    /// Fails only if signing fails.
    pub fn issue(&self, user_id: i64, username: &str, role: &str) -> Result<String, AuthError> {
        let claims = Claims {
            user_id,
            username: username.to_string(),
            role: role.to_string(),
            exp: Utc::now().timestamp() + self.token_ttl.as_secs() as i64,
        };

        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(ring.current()),
        )
        .map_err(|e| {
            error!(error = %e, "failed to sign token");
            AuthError::Internal("failed to sign token".to_string())
        })
    }

    /// Validate a token and return its claims.
    ///
    /// Checks the validation cache first; on miss, tries the current
    /// secret and then the retired secrets in recency order. The first
    /// successful verification is cached. Cached claims are re-checked
    /// against their embedded expiry so a cache hit can never outlive the
    /// token itself.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        if let Some(claims) = self.cache.get(token) {
            if claims.is_expired() {
                return Err(AuthError::Expired);
            }
            return Ok(claims);
        }

        // The ring lock is released before touching the cache again.
        let verified = {
            let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
            let mut outcome = Err(AuthError::InvalidSignature);
            for secret in ring.secrets_newest_first() {
                match decode_with_secret(token, secret) {
                    Ok(claims) => {
                        outcome = Ok(claims);
                        break;
                    }
                    // Another secret may still verify it.
                    Err(AuthError::InvalidSignature) => continue,
                    // Malformed or expired is terminal regardless of secret:
                    // expiry is only reported after a successful verification.
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
            outcome
        };

        match verified {
            Ok(claims) => {
                self.cache.insert(token.to_string(), claims.clone());
                Ok(claims)
            }
            Err(AuthError::InvalidSignature) => {
                debug!("no signing secret verifies token");
                Err(AuthError::InvalidSignature)
            }
            Err(e) => Err(e),
        }
    }

    /// Retire the current secret and install a new one.
    ///
    /// Exclusive-locks the ring; tokens signed with a secret trimmed out
    /// of the retired FIFO become permanently unverifiable. The token
    /// cache is cleared so no claims verified under the dropped secret
    /// survive the rotation.
    pub fn rotate(&self, new_secret: impl Into<Vec<u8>>) {
        {
            let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
            ring.rotate(new_secret);
        }
        self.cache.clear();
        info!("signing secret rotated");
    }

    /// Configured token lifetime.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub(crate) fn sweep_cache(&self) {
        self.cache.sweep();
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

fn decode_with_secret(token: &str, secret: &[u8]) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    match decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => Err(match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            // An unexpected algorithm can never verify against our secrets.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidSignature
            }
            _ => AuthError::Malformed,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &[u8], capacity: usize) -> TokenService {
        TokenService::new(
            secret.to_vec(),
            capacity,
            Duration::from_secs(300),
            Duration::from_secs(60),
        )
    }

    fn sign_with(secret: &[u8], claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let svc = service(b"testsecret", 2);
        let token = svc.issue(42, "user42", "admin").unwrap();

        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "user42");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_roles_survive_roundtrip() {
        let svc = service(b"testsecret", 2);
        for role in ["student", "teacher", "admin", "guest", "custom_role_123"] {
            let token = svc.issue(1, "user", role).unwrap();
            let claims = svc.validate(&token).unwrap();
            assert_eq!(claims.role, role);
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = service(b"secret-one", 2);
        let verifier = service(b"secret-two", 2);

        let token = signer.issue(1, "u", "admin").unwrap();
        assert!(matches!(
            verifier.validate(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let svc = service(b"testsecret", 2);
        assert!(matches!(svc.validate("not-a-jwt"), Err(AuthError::Malformed)));
        assert!(matches!(
            svc.validate("a.b.c"),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(svc.validate(""), Err(AuthError::Malformed)));
    }

    #[test]
    fn test_expired_token_rejected_after_signature_check() {
        let svc = service(b"testsecret", 2);
        let stale = Claims {
            user_id: 1,
            username: "u".to_string(),
            role: "admin".to_string(),
            exp: Utc::now().timestamp() - 60,
        };

        // Correct secret, past expiry.
        let token = sign_with(b"testsecret", &stale);
        assert!(matches!(svc.validate(&token), Err(AuthError::Expired)));

        // Wrong secret wins over expiry: the signature never verifies.
        let token = sign_with(b"wrong-secret", &stale);
        assert!(matches!(
            svc.validate(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_retired_secret_still_verifies() {
        let svc = service(b"first", 2);
        let token = svc.issue(7, "u", "admin").unwrap();

        svc.rotate(b"second".to_vec());
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.user_id, 7);
    }

    #[test]
    fn test_secret_dropped_beyond_capacity_is_unverifiable() {
        let svc = service(b"first", 1);
        let before = svc.issue(1, "u", "admin").unwrap();

        svc.rotate(b"second".to_vec());
        let between = svc.issue(2, "u", "admin").unwrap();

        svc.rotate(b"third".to_vec());

        // "first" was trimmed out of the capacity-1 ring.
        assert!(matches!(
            svc.validate(&before),
            Err(AuthError::InvalidSignature)
        ));
        // "second" is still retired and verifiable.
        assert!(svc.validate(&between).is_ok());
    }

    #[test]
    fn test_cache_hit_matches_cold_validation() {
        let svc = service(b"testsecret", 2);
        let token = svc.issue(9, "u", "student").unwrap();

        let cold = svc.validate(&token).unwrap();
        let warm = svc.validate(&token).unwrap();
        assert_eq!(cold, warm);

        svc.clear_cache();
        let recold = svc.validate(&token).unwrap();
        assert_eq!(cold, recold);
    }

    #[test]
    fn test_cached_claims_do_not_outlive_token_expiry() {
        let svc = TokenService::new(
            b"testsecret".to_vec(),
            2,
            Duration::from_secs(300),
            Duration::from_secs(60),
        );

        let stale = Claims {
            user_id: 1,
            username: "u".to_string(),
            role: "admin".to_string(),
            exp: Utc::now().timestamp() - 1,
        };
        let token = sign_with(b"testsecret", &stale);

        // Plant the expired claims directly in the cache; a hit must still
        // report expiry.
        svc.cache.insert(token.clone(), stale);
        assert!(matches!(svc.validate(&token), Err(AuthError::Expired)));
    }
}
