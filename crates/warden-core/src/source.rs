//! External collaborators: policy and secret sources
//!
//! The core never reads files or the network itself. The host supplies
//! these traits; load failures at start-up are fatal to construction,
//! reload failures keep the previous policy and surface the error.

use crate::error::AuthError;
use crate::policy::PolicySet;

/// Provides the role→policy mapping on load and reload.
pub trait PolicySource: Send + Sync {
    fn load(&self) -> Result<PolicySet, AuthError>;
}

/// A fixed in-memory policy set is itself a source.
impl PolicySource for PolicySet {
    fn load(&self) -> Result<PolicySet, AuthError> {
        Ok(self.clone())
    }
}

impl<F> PolicySource for F
where
    F: Fn() -> Result<PolicySet, AuthError> + Send + Sync,
{
    fn load(&self) -> Result<PolicySet, AuthError> {
        self()
    }
}

/// Provides the initial signing secret.
pub trait SecretSource: Send + Sync {
    fn initial_secret(&self) -> Result<Vec<u8>, AuthError>;
}

impl SecretSource for Vec<u8> {
    fn initial_secret(&self) -> Result<Vec<u8>, AuthError> {
        Ok(self.clone())
    }
}

impl SecretSource for &str {
    fn initial_secret(&self) -> Result<Vec<u8>, AuthError> {
        Ok(self.as_bytes().to_vec())
    }
}
