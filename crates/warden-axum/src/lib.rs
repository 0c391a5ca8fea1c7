//! Axum bindings for the warden access-control core.
//!
//! Exposes the two pipeline stages as ordinary axum middleware plus an
//! extractor for the authenticated claims. A host wires them up like so:
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{routing::get, Router};
//! use warden_axum::{protect_owned, RequireClaims};
//! use warden_core::{AccessControl, AuthConfig, PolicySet};
//!
//! let acs = Arc::new(AccessControl::new(&"secret", policies, AuthConfig::new())?);
//! let app: Router = protect_owned(
//!     Router::new().route("/grades/{id}", get(show_grade)),
//!     Arc::clone(&acs),
//! );
//!
//! async fn show_grade(claims: RequireClaims) -> String {
//!     format!("grades for {}", claims.username)
//! }
//! ```

pub mod context;
pub mod error;
pub mod middleware;

pub use context::{ClaimsExt, RequireClaims};
pub use error::PipelineError;
pub use middleware::{
    authorize, enforce_ownership, protect, protect_owned, protect_owned_with_limit,
    OwnershipState, DEFAULT_MAX_BODY_BYTES,
};
