//! Signing-secret ring
//!
//! Holds the current signing secret plus a bounded FIFO of retired
//! secrets, so signing keys can rotate without invalidating every
//! outstanding session at once. When the ring overflows its capacity the
//! oldest retired secret is dropped and tokens signed with it become
//! permanently unverifiable — the key-compromise recovery property.

use std::collections::VecDeque;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Current plus retired signing secrets.
///
/// Mutated only by [`SecretRing::rotate`]; read by every validation
/// attempt. The owning service wraps it in a reader/writer lock.
pub struct SecretRing {
    current: Vec<u8>,
    retired: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl SecretRing {
    /// Create a ring from the initial signing secret.
    pub fn new(initial: impl Into<Vec<u8>>, capacity: usize) -> Self {
        Self {
            current: initial.into(),
            retired: VecDeque::new(),
            capacity,
        }
    }

    /// The current signing secret.
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    /// Number of retired secrets still verifiable.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Install a new current secret, retiring the old one.
    ///
    /// With capacity 0 the old secret is dropped outright. Otherwise it
    /// joins the retired FIFO and the oldest entries are trimmed until
    /// `retired.len() <= capacity` holds again.
    pub fn rotate(&mut self, new_secret: impl Into<Vec<u8>>) {
        let old = std::mem::replace(&mut self.current, new_secret.into());
        if self.capacity > 0 {
            self.retired.push_back(old);
            while self.retired.len() > self.capacity {
                self.retired.pop_front();
            }
        }
    }

    /// All verifiable secrets: current first, then retired from most- to
    /// least-recently retired.
    pub fn secrets_newest_first(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.current.as_slice())
            .chain(self.retired.iter().rev().map(Vec::as_slice))
    }
}

impl std::fmt::Debug for SecretRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRing")
            .field("retired", &self.retired.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Generate a fresh random signing secret (32 random bytes, base64).
///
/// Used by the timed rotation task.
pub fn random_secret() -> Vec<u8> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes).into_bytes()
}
