//! Error taxonomy for the access-control core

use thiserror::Error;

/// Access-control errors
///
/// Every rejection the core can produce is a typed variant; nothing is
/// silently swallowed. Cache operations never appear here — a cache miss
/// degrades to recomputation, never an error.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Token cannot be decoded at all
    #[error("malformed token")]
    Malformed,

    /// No known signing secret verifies the token
    #[error("invalid token signature")]
    InvalidSignature,

    /// Signature verified, but the embedded expiry has passed
    #[error("token expired")]
    Expired,

    /// No policy entry exists for the role
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The role's section scan found no grant for the request
    #[error("access denied by policy")]
    PolicyDenied,

    /// Path or body subject id differs from the authenticated subject
    #[error("ownership violation")]
    OwnershipViolation,

    /// Policy or secret source unreachable at load or reload
    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Internal error (e.g., signing failure)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Malformed | Self::InvalidSignature | Self::Expired => 401,
            Self::UnknownRole(_) | Self::PolicyDenied | Self::OwnershipViolation => 403,
            Self::ConfigUnavailable(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::UnknownRole(_) => "UNKNOWN_ROLE",
            Self::PolicyDenied => "POLICY_DENIED",
            Self::OwnershipViolation => "OWNERSHIP_VIOLATION",
            Self::ConfigUnavailable(_) => "CONFIG_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Malformed.status_code(), 401);
        assert_eq!(AuthError::InvalidSignature.status_code(), 401);
        assert_eq!(AuthError::Expired.status_code(), 401);
        assert_eq!(AuthError::UnknownRole("x".into()).status_code(), 403);
        assert_eq!(AuthError::PolicyDenied.status_code(), 403);
        assert_eq!(AuthError::OwnershipViolation.status_code(), 403);
        assert_eq!(AuthError::ConfigUnavailable("x".into()).status_code(), 500);
        assert_eq!(AuthError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::UnknownRole("intern".into());
        assert_eq!(err.to_string(), "unknown role: intern");
        assert_eq!(err.error_code(), "UNKNOWN_ROLE");
    }
}
