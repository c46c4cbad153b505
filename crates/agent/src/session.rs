//! Conversation session
//!
//! A session owns exactly one `SessionMemory`. Exchanges on a session are
//! serialized by an async lock held for the whole exchange; the memory
//! itself sits behind a short-lived sync lock that is never held across an
//! await point.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use voice_turn_core::Turn;

use crate::memory::SessionMemory;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    InExchange,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,
    state: Mutex<SessionState>,
    memory: Mutex<SessionMemory>,
    exchange_lock: AsyncMutex<()>,
}

impl Session {
    pub fn new(id: impl Into<String>, memory: SessionMemory) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_activity: Mutex::new(now),
            state: Mutex::new(SessionState::Idle),
            memory: Mutex::new(memory),
            exchange_lock: AsyncMutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }

    /// True when idle for longer than `timeout` with no exchange in flight
    pub fn is_expired(&self, timeout: Duration) -> bool {
        if self.state() == SessionState::InExchange {
            return false;
        }
        let idle = Utc::now() - self.last_activity();
        match chrono::Duration::from_std(timeout) {
            Ok(limit) => idle > limit,
            Err(_) => false,
        }
    }

    /// Run a closure against the memory under its lock
    pub fn with_memory<R>(&self, f: impl FnOnce(&mut SessionMemory) -> R) -> R {
        f(&mut self.memory.lock())
    }

    pub fn message_count(&self) -> usize {
        self.memory.lock().len()
    }

    pub fn history(&self) -> Vec<Turn> {
        self.memory.lock().snapshot()
    }

    /// Wait for any in-flight exchange, then mark the session `InExchange`
    ///
    /// The session returns to `Idle` when the guard is dropped.
    pub async fn begin_exchange(&self) -> ExchangeGuard<'_> {
        let lock = self.exchange_lock.lock().await;
        *self.state.lock() = SessionState::InExchange;
        self.touch();
        ExchangeGuard {
            session: self,
            _lock: lock,
        }
    }

    /// Wait for any in-flight exchange without entering one
    pub async fn wait_idle(&self) -> AsyncMutexGuard<'_, ()> {
        self.exchange_lock.lock().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("messages", &self.message_count())
            .finish()
    }
}

/// Exclusive hold on a session for one exchange
pub struct ExchangeGuard<'a> {
    session: &'a Session,
    _lock: AsyncMutexGuard<'a, ()>,
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        *self.session.state.lock() = SessionState::Idle;
        self.session.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voice_turn_core::TurnRole;

    #[tokio::test]
    async fn test_exchange_guard_tracks_state() {
        let session = Session::new("s1", SessionMemory::new(5));
        assert_eq!(session.state(), SessionState::Idle);

        {
            let _guard = session.begin_exchange().await;
            assert_eq!(session.state(), SessionState::InExchange);
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_exchanges_do_not_overlap() {
        let session = Arc::new(Session::new("s1", SessionMemory::new(5)));
        let guard = session.begin_exchange().await;

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                let _guard = session.begin_exchange().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_expiry() {
        let session = Session::new("s1", SessionMemory::new(5));
        assert!(!session.is_expired(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(5));
        assert!(session.is_expired(Duration::from_millis(1)));

        session.touch();
        assert!(!session.is_expired(Duration::from_secs(60)));
    }

    #[test]
    fn test_memory_access() {
        let session = Session::new("s1", SessionMemory::new(5));
        session.with_memory(|m| m.add_message(TurnRole::User, "hello"));

        assert_eq!(session.message_count(), 1);
        assert_eq!(session.history()[0].content, "hello");
    }
}
