//! The two pipeline stages.
//!
//! Stage one authenticates the bearer token and evaluates role/section
//! policy; stage two enforces the own-records-only constraint. Both are
//! plain axum middleware functions so a host composes them with
//! `middleware::from_fn_with_state`, or via [`protect`] /
//! [`protect_owned`] which apply them in the right order.
//!
//! Per request:
//! `Unauthenticated → [401 no/invalid token] | Authenticated →
//! [403 unknown role] | RoleResolved → [403 policy denial] | Authorized →
//! [403 ownership violation] | OwnershipOK → handler`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use warden_core::policy::is_mutating_method;
use warden_core::{AccessControl, AuthError};

use crate::context::ClaimsExt;
use crate::error::PipelineError;

/// Default cap on request bodies buffered for ownership inspection.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// State handed to the ownership stage: the shared core plus the cap on
/// bodies it will buffer.
#[derive(Debug, Clone)]
pub struct OwnershipState {
    pub acs: Arc<AccessControl>,
    pub max_body_bytes: usize,
}

/// Stage one: authenticate the bearer token and authorize the request.
///
/// On grant the claims are attached to the request extensions for stage
/// two and the handler; the token is never parsed again downstream.
pub async fn authorize(
    State(acs): State<Arc<AccessControl>>,
    mut req: Request,
    next: Next,
) -> Result<Response, PipelineError> {
    let token = bearer_token(&req).ok_or(PipelineError::MissingToken)?;

    let claims = acs.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        PipelineError::Auth(e)
    })?;

    if !acs.has_role(&claims.role) {
        tracing::debug!(role = %claims.role, "role has no policy entry");
        return Err(AuthError::UnknownRole(claims.role).into());
    }

    let path = req.uri().path().to_string();
    if !acs.authorize(&claims.role, &path, req.method()) {
        tracing::debug!(role = %claims.role, %path, method = %req.method(), "denied by policy");
        return Err(AuthError::PolicyDenied.into());
    }

    req.extensions_mut().insert(ClaimsExt(claims));
    Ok(next.run(req).await)
}

/// Stage two: enforce the own-records-only constraint.
///
/// Reads the claims attached by stage one. For mutating methods the
/// request body is buffered for inspection and restored in full before
/// the handler runs, whatever the outcome. Bodies larger than
/// `max_body_bytes` are rejected outright rather than buffered.
pub async fn enforce_ownership(
    State(state): State<OwnershipState>,
    req: Request,
    next: Next,
) -> Result<Response, PipelineError> {
    let OwnershipState {
        acs,
        max_body_bytes,
    } = state;
    let claims = req
        .extensions()
        .get::<ClaimsExt>()
        .cloned()
        .ok_or(PipelineError::MissingContext)?
        .0;

    match acs.own_records_only(&claims.role) {
        // Stage one vouched for the role; a reload can still pull it out
        // from under us mid-request.
        None => return Err(AuthError::UnknownRole(claims.role).into()),
        Some(false) => return Ok(next.run(req).await),
        Some(true) => {}
    }

    let path_id = trailing_id(req.uri().path());
    let method = req.method().clone();

    if is_mutating_method(&method) {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, max_body_bytes)
            .await
            .map_err(|_| PipelineError::BodyRead)?;

        let allowed =
            acs.enforce_ownership(&claims.role, claims.user_id, path_id, &method, Some(&bytes));

        // The handler expects to read the body again in full.
        let req = Request::from_parts(parts, Body::from(bytes));
        if !allowed {
            return Err(AuthError::OwnershipViolation.into());
        }
        Ok(next.run(req).await)
    } else {
        if !acs.enforce_ownership(&claims.role, claims.user_id, path_id, &method, None) {
            return Err(AuthError::OwnershipViolation.into());
        }
        Ok(next.run(req).await)
    }
}

/// Apply stage one in front of every route in `router`.
pub fn protect<S>(router: Router<S>, acs: Arc<AccessControl>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(acs, authorize))
}

/// Apply both stages: authenticate-and-authorize, then enforce-ownership.
///
/// Buffered bodies are capped at [`DEFAULT_MAX_BODY_BYTES`]; use
/// [`protect_owned_with_limit`] to tune the cap.
pub fn protect_owned<S>(router: Router<S>, acs: Arc<AccessControl>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    protect_owned_with_limit(router, acs, DEFAULT_MAX_BODY_BYTES)
}

/// [`protect_owned`] with an explicit cap on buffered request bodies.
pub fn protect_owned_with_limit<S>(
    router: Router<S>,
    acs: Arc<AccessControl>,
    max_body_bytes: usize,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let ownership = OwnershipState {
        acs: Arc::clone(&acs),
        max_body_bytes,
    };
    // The last layer added runs first, so ownership sits inside
    // authorization.
    router
        .layer(middleware::from_fn_with_state(ownership, enforce_ownership))
        .layer(middleware::from_fn_with_state(acs, authorize))
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Parse the trailing path segment as a subject id, if there is one.
fn trailing_id(path: &str) -> Option<i64> {
    path.rsplit('/').find(|s| !s.is_empty())?.parse().ok()
}
