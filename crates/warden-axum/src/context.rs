//! Request-scoped claims context.
//!
//! Stage one of the pipeline attaches the authenticated [`Claims`] to the
//! request's extensions; stage two and the downstream handler read them
//! from there. The claims are read-only for the remainder of the request
//! lifecycle — nothing downstream re-parses the token.

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_core::Claims;

use crate::error::PipelineError;

/// Extension key for storing claims in request extensions.
#[derive(Debug, Clone)]
pub struct ClaimsExt(pub Claims);

/// Extractor that requires authenticated claims on the request.
///
/// Handlers behind the pipeline can take this to read the caller's
/// identity; it rejects with 500 if the pipeline was not applied.
///
/// # Example
///
/// ```ignore
/// async fn me(claims: RequireClaims) -> String {
///     format!("{} ({})", claims.username, claims.role)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireClaims(pub Claims);

impl Deref for RequireClaims {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequireClaims
where
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClaimsExt>()
            .cloned()
            .map(|ext| Self(ext.0))
            .ok_or(PipelineError::MissingContext)
    }
}
