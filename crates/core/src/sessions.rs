use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::domain::session::{Session, UserId};

/// Shared, lockable session. The lock serializes every read-modify-write on
/// one user's cart and history.
pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// In-memory sessions keyed by user. Sessions are created on first use and
/// never removed.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, user_id: &UserId) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new())))
            .clone()
    }

    pub fn get(&self, user_id: &UserId) -> Option<SessionHandle> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
