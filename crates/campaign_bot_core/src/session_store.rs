//! crates/campaign_bot_core/src/session_store.rs
//!
//! In-memory store of in-progress conversations, one entry per user.
//! Starts empty with the process and is never persisted.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{Session, UserId};

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<Session> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.get(&user).copied()
    }

    /// Creates or overwrites the user's session.
    pub fn put(&self, user: UserId, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user, session);
    }

    pub fn remove(&self, user: UserId) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CampaignType;

    #[test]
    fn put_overwrites_previous_choice() {
        let store = SessionStore::new();
        store.put(UserId(5), Session { campaign_type: CampaignType::Nda });
        store.put(UserId(5), Session { campaign_type: CampaignType::FirstCpa });

        assert_eq!(
            store.get(UserId(5)),
            Some(Session { campaign_type: CampaignType::FirstCpa })
        );
    }

    #[test]
    fn remove_clears_only_that_user() {
        let store = SessionStore::new();
        store.put(UserId(1), Session { campaign_type: CampaignType::Nda });
        store.put(UserId(2), Session { campaign_type: CampaignType::Nda });

        assert!(store.remove(UserId(1)).is_some());
        assert!(store.get(UserId(1)).is_none());
        assert!(store.get(UserId(2)).is_some());
    }
}
