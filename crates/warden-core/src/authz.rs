//! Role/section authorization engine
//!
//! Decides, for a role, path, and method, whether access is granted, and
//! separately enforces identity-ownership constraints for roles limited
//! to their own records. Decisions — including denials — are cached
//! keyed by `role:path:method`; a reload swaps the whole policy set
//! under the write lock and clears the decision cache so no stale grant
//! survives a policy change.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use http::Method;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::policy::{is_mutating_method, PolicySet};

/// Shared authorization engine.
///
/// Readers take the shared lock; reload takes the exclusive lock and
/// replaces the pointer, so in-flight readers observe a consistent
/// old-or-new policy, never a partial one.
pub struct AuthzEngine {
    policies: RwLock<Arc<PolicySet>>,
    decisions: TtlCache<String, bool>,
}

impl AuthzEngine {
    pub fn new(policies: PolicySet, decision_cache_ttl: Duration) -> Self {
        Self {
            policies: RwLock::new(Arc::new(policies)),
            decisions: TtlCache::new(decision_cache_ttl),
        }
    }

    /// Whether `role` may perform `method` on `path`.
    ///
    /// Fails closed: an unknown role is denied, not escalated to an
    /// error. The boolean outcome is cached either way; the cache can
    /// never change the answer, only skip the scan.
    pub fn authorize(&self, role: &str, path: &str, method: &Method) -> bool {
        let key = decision_key(role, path, method);
        if let Some(granted) = self.decisions.get(&key) {
            return granted;
        }

        let policies = self.snapshot();
        let granted = match policies.role(role) {
            Some(policy) => policy.grants(path, method),
            None => {
                debug!(role, "no policy entry for role");
                false
            }
        };

        self.decisions.insert(key, granted);
        granted
    }

    /// Whether the policy set has an entry for `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.snapshot().role(role).is_some()
    }

    /// Whether `role` is restricted to its own records.
    ///
    /// `None` when the role has no policy entry.
    pub fn own_records_only(&self, role: &str) -> Option<bool> {
        self.snapshot()
            .role(role)
            .map(|policy| policy.own_records_only)
    }

    /// Enforce the own-records-only constraint for one request.
    ///
    /// Denies when a path-embedded id is present and differs from the
    /// caller's subject id; for mutating methods additionally denies when
    /// the request body carries an explicit, differing `user_id`. Absent
    /// or unparsable identifiers are non-conflicting and pass. Roles
    /// without the restriction always pass; unknown roles fail closed.
    pub fn enforce_ownership(
        &self,
        role: &str,
        subject_id: i64,
        path_id: Option<i64>,
        method: &Method,
        body: Option<&[u8]>,
    ) -> bool {
        let Some(own_only) = self.own_records_only(role) else {
            debug!(role, "ownership check for unknown role");
            return false;
        };
        if !own_only {
            return true;
        }

        if let Some(id) = path_id {
            if id != subject_id {
                debug!(subject_id, path_id = id, "path id does not belong to caller");
                return false;
            }
        }

        if is_mutating_method(method) {
            if let Some(body_id) = body.and_then(body_subject_id) {
                if body_id != subject_id {
                    debug!(subject_id, body_id, "body subject does not belong to caller");
                    return false;
                }
            }
        }

        true
    }

    /// Replace the entire policy set.
    pub fn reload(&self, policies: PolicySet) {
        {
            let mut guard = self
                .policies
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::new(policies);
        }
        self.decisions.clear();
        info!("policy set reloaded");
    }

    fn snapshot(&self) -> Arc<PolicySet> {
        Arc::clone(&self.policies.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn sweep_cache(&self) {
        self.decisions.sweep();
    }

    pub(crate) fn clear_cache(&self) {
        self.decisions.clear();
    }
}

impl std::fmt::Debug for AuthzEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzEngine").finish_non_exhaustive()
    }
}

fn decision_key(role: &str, path: &str, method: &Method) -> String {
    format!("{role}:{path}:{method}")
}

/// Extract an explicit subject id from a JSON request body.
///
/// Unparsable bodies and bodies without a `user_id` field yield `None`.
fn body_subject_id(body: &[u8]) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("user_id")?.as_i64()
}
