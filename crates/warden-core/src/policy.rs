//! Role policies
//!
//! A role maps to an ordered list of URL-prefix sections with independent
//! read/write grants, plus an own-records-only flag. Section order is
//! significant: the first prefix-matching section decides the outcome and
//! no merging of later matches occurs.
//!
//! The types derive serde so a host can deserialize its policy source
//! directly into a [`PolicySet`]; the core itself never parses files.

use std::collections::HashMap;

use http::Method;
use serde::{Deserialize, Serialize};

/// A URL-prefix-scoped read/write grant within a role's policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Human-readable label
    pub name: String,
    /// Matches any request path starting with this prefix
    #[serde(alias = "url")]
    pub url_prefix: String,
    pub can_read: bool,
    pub can_write: bool,
}

impl Section {
    pub fn new(
        name: impl Into<String>,
        url_prefix: impl Into<String>,
        can_read: bool,
        can_write: bool,
    ) -> Self {
        Self {
            name: name.into(),
            url_prefix: url_prefix.into(),
            can_read,
            can_write,
        }
    }
}

/// The policy attached to one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Scanned in order; first prefix match wins
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Restricts the role to resources owned by the caller
    #[serde(default)]
    pub own_records_only: bool,
}

impl RolePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section to the scan order.
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Restrict the role to its own records.
    #[must_use]
    pub fn own_records_only(mut self) -> Self {
        self.own_records_only = true;
        self
    }

    /// Direct linear first-match scan of the sections.
    pub fn grants(&self, path: &str, method: &Method) -> bool {
        for section in &self.sections {
            if path.starts_with(&section.url_prefix) {
                if is_read_method(method) {
                    return section.can_read;
                }
                if is_mutating_method(method) {
                    return section.can_write;
                }
                return false;
            }
        }
        false
    }
}

/// Mapping from role name to its policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default)]
    pub roles: HashMap<String, RolePolicy>,
}

impl PolicySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a role's policy.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, policy: RolePolicy) -> Self {
        self.roles.insert(role.into(), policy);
        self
    }

    pub fn role(&self, role: &str) -> Option<&RolePolicy> {
        self.roles.get(role)
    }
}

/// GET, HEAD, and OPTIONS are gated by `can_read`.
pub fn is_read_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS
}

/// POST, PUT, PATCH, and DELETE are gated by `can_write`.
pub fn is_mutating_method(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}
