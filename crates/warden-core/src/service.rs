//! Access-control facade
//!
//! [`AccessControl`] ties together the token service, the authorization
//! engine, and the credential hasher behind one explicitly owned,
//! injected handle — no process-wide singletons — so tests can run
//! concurrently with independent instances.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::authz::AuthzEngine;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::secrets::random_secret;
use crate::source::{PolicySource, SecretSource};
use crate::token::{Claims, TokenService};

/// One shared access-control core for an HTTP service.
pub struct AccessControl {
    tokens: TokenService,
    authz: AuthzEngine,
    passwords: PasswordHasher,
    policy_source: Box<dyn PolicySource>,
    rotation_period: Option<Duration>,
    sweep_interval: Duration,
}

impl AccessControl {
    /// Build the core from its external collaborators.
    ///
    /// A failing secret or policy source is fatal here — the service must
    /// not start without either.
    pub fn new(
        secrets: &dyn SecretSource,
        policies: impl PolicySource + 'static,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let initial_secret = secrets.initial_secret()?;
        let policy_set = policies.load()?;

        Ok(Self {
            tokens: TokenService::new(
                initial_secret,
                config.retired_capacity,
                config.token_ttl,
                config.token_cache_ttl,
            ),
            authz: AuthzEngine::new(policy_set, config.decision_cache_ttl),
            passwords: PasswordHasher::new(config.bcrypt_cost, config.password_cache_ttl),
            policy_source: Box::new(policies),
            rotation_period: config.rotation_period,
            sweep_interval: config.sweep_interval,
        })
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Issue a signed token for the subject.
    pub fn issue_token(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
    ) -> Result<String, AuthError> {
        self.tokens.issue(user_id, username, role)
    }

    /// Validate a bearer token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.validate(token)
    }

    /// Rotate the signing secret by hand.
    pub fn rotate_secret(&self, new_secret: impl Into<Vec<u8>>) {
        self.tokens.rotate(new_secret);
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Whether the policy set knows this role.
    pub fn has_role(&self, role: &str) -> bool {
        self.authz.has_role(role)
    }

    /// Role/section policy decision for one request.
    pub fn authorize(&self, role: &str, path: &str, method: &Method) -> bool {
        self.authz.authorize(role, path, method)
    }

    /// Whether the role is restricted to its own records.
    pub fn own_records_only(&self, role: &str) -> Option<bool> {
        self.authz.own_records_only(role)
    }

    /// Own-records-only enforcement for one request.
    pub fn enforce_ownership(
        &self,
        role: &str,
        subject_id: i64,
        path_id: Option<i64>,
        method: &Method,
        body: Option<&[u8]>,
    ) -> bool {
        self.authz
            .enforce_ownership(role, subject_id, path_id, method, body)
    }

    /// Re-load policies from the source.
    ///
    /// On failure the previous policy keeps serving and the error is
    /// surfaced to the operator.
    pub fn reload_policies(&self) -> Result<(), AuthError> {
        match self.policy_source.load() {
            Ok(policy_set) => {
                self.authz.reload(policy_set);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "policy reload failed, keeping previous policy");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Hash a password at the configured cost.
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        self.passwords.hash(password)
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        self.passwords.verify(password, hash)
    }

    // =========================================================================
    // Cache management and background tasks
    // =========================================================================

    /// Drop every cached token, password, and decision result.
    pub fn clear_caches(&self) {
        self.tokens.clear_cache();
        self.passwords.clear_cache();
        self.authz.clear_cache();
    }

    /// One physical-removal pass over all three caches.
    pub fn sweep_caches(&self) {
        self.tokens.sweep_cache();
        self.passwords.sweep_cache();
        self.authz.sweep_cache();
    }

    /// Start the rotation timer (if configured) and the cache sweeper.
    ///
    /// Both run independently of request-serving tasks and stop
    /// deterministically through [`BackgroundTasks::shutdown`].
    pub fn spawn_background(self: &Arc<Self>) -> BackgroundTasks {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut handles = Vec::new();

        if let Some(period) = self.rotation_period {
            let service = Arc::clone(self);
            let mut shutdown = shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // interval fires immediately; the initial secret must
                // serve a full period first.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = ticker.tick() => service.rotate_secret(random_secret()),
                    }
                }
                debug!("rotation task stopped");
            }));
        }

        let service = Arc::clone(self);
        let mut shutdown = shutdown_tx.subscribe();
        let interval = self.sweep_interval;
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => service.sweep_caches(),
                }
            }
            debug!("sweep task stopped");
        }));

        info!(tasks = handles.len(), "background tasks started");
        BackgroundTasks {
            shutdown: shutdown_tx,
            handles,
        }
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("tokens", &self.tokens)
            .field("rotation_period", &self.rotation_period)
            .finish_non_exhaustive()
    }
}

/// Handle to the spawned rotation and sweep timers.
///
/// Dropping the handle without calling [`Self::shutdown`] aborts the
/// tasks on the spot; shutdown signals them and waits for a clean exit,
/// so no final rotation or sweep races process exit.
pub struct BackgroundTasks {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Signal both tasks and wait for them to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
