//! Process-wide session store.
//!
//! Maps user ids to their workflow sessions. The store hands out
//! `Arc<Mutex<Session>>` so a handler can hold one user's session locked
//! across file downloads and sends: events from the same user serialize on
//! that lock, while distinct users only contend on the brief map access.

use crate::session::{Session, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared map of live sessions, keyed by user id.
///
/// Sessions are created on first interaction and removed when /finish
/// completes; there is no other lifecycle.
pub struct SessionStore {
    default_doc_prefix: String,
    sessions: Mutex<HashMap<UserId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Empty store; new sessions start with `default_doc_prefix`.
    #[must_use]
    pub fn new(default_doc_prefix: impl Into<String>) -> Self {
        Self {
            default_doc_prefix: default_doc_prefix.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `user_id`, created fresh on first interaction.
    pub async fn obtain(&self, user_id: UserId) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(self.default_doc_prefix.clone()))))
            .clone()
    }

    /// Session for `user_id`, if one exists.
    pub async fn get(&self, user_id: UserId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.get(&user_id).cloned()
    }

    /// Replace any existing session with a fresh one (the /start reset).
    pub async fn reset(&self, user_id: UserId) -> Arc<Mutex<Session>> {
        let fresh = Arc::new(Mutex::new(Session::new(self.default_doc_prefix.clone())));
        self.sessions.lock().await.insert(user_id, fresh.clone());
        fresh
    }

    /// Destroy a session. Returns whether one existed.
    pub async fn remove(&self, user_id: UserId) -> bool {
        self.sessions.lock().await.remove(&user_id).is_some()
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
