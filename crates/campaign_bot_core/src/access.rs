//! crates/campaign_bot_core/src/access.rs
//!
//! The authorization gate: which users have supplied the shared secret.

use std::collections::HashSet;
use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::domain::UserId;

/// Process-scoped set of authorized users. Membership only ever grows.
pub struct AccessGate {
    secret: SecretString,
    authorized: RwLock<HashSet<UserId>>,
}

impl AccessGate {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            authorized: RwLock::new(HashSet::new()),
        }
    }

    pub fn is_authorized(&self, user: UserId) -> bool {
        self.authorized
            .read()
            .map(|set| set.contains(&user))
            .unwrap_or_else(|poisoned| poisoned.into_inner().contains(&user))
    }

    /// Adds `user` to the set when `supplied` matches the secret.
    /// Returns false, with no state change, otherwise.
    pub fn try_authorize(&self, user: UserId, supplied: &str) -> bool {
        let expected = self.secret.expose_secret().as_bytes();
        let matches: bool = supplied.trim().as_bytes().ct_eq(expected).into();
        if !matches {
            return false;
        }

        let mut set = self
            .authorized
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if set.insert(user) {
            info!("User {} authorized.", user);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AccessGate {
        AccessGate::new(SecretString::new("hunter2".to_string()))
    }

    #[test]
    fn users_start_unauthorized() {
        assert!(!gate().is_authorized(UserId(1)));
    }

    #[test]
    fn wrong_secret_leaves_user_locked() {
        let gate = gate();
        assert!(!gate.try_authorize(UserId(1), "hunter"));
        assert!(!gate.try_authorize(UserId(1), "hunter22"));
        assert!(!gate.try_authorize(UserId(1), ""));
        assert!(!gate.is_authorized(UserId(1)));
    }

    #[test]
    fn correct_secret_authorizes_only_that_user() {
        let gate = gate();
        assert!(gate.try_authorize(UserId(1), "  hunter2\n"));
        assert!(gate.is_authorized(UserId(1)));
        assert!(!gate.is_authorized(UserId(2)));
    }

    #[test]
    fn authorization_is_never_revoked() {
        let gate = gate();
        assert!(gate.try_authorize(UserId(1), "hunter2"));
        assert!(!gate.try_authorize(UserId(1), "wrong"));
        assert!(gate.is_authorized(UserId(1)));
    }
}
