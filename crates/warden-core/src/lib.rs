//! Warden Core - In-process access control for HTTP services
//!
//! Authenticates bearer tokens against a rotating secret ring, evaluates
//! role/section authorization policy per request, hashes credentials,
//! and caches the results of all three to keep per-request overhead low
//! under load.
//!
//! The core performs no network or disk I/O on the request path: policy
//! and secret loading happen only at start-up, on explicit reload, or on
//! the rotation timer. HTTP framework integration lives in the
//! companion `warden-axum` crate.

pub mod authz;
pub mod cache;
pub mod config;
pub mod error;
pub mod password;
pub mod policy;
pub mod secrets;
pub mod service;
pub mod source;
pub mod token;

pub use authz::AuthzEngine;
pub use cache::TtlCache;
pub use config::AuthConfig;
pub use error::AuthError;
pub use password::PasswordHasher;
pub use policy::{PolicySet, RolePolicy, Section};
pub use secrets::{random_secret, SecretRing};
pub use service::{AccessControl, BackgroundTasks};
pub use source::{PolicySource, SecretSource};
pub use token::{Claims, TokenService};
