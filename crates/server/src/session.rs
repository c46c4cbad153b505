//! Session Management
//!
//! Maps session ids to conversation sessions. Sessions are created on first
//! use and expire after a period without activity; a background task sweeps
//! expired sessions on a fixed interval. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use voice_turn_agent::{Session, SessionMemory, SessionState};
use voice_turn_config::{ConversationConfig, SessionConfig};

use crate::ServerError;

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub state: SessionState,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            state: session.state(),
            message_count: session.message_count(),
            created_at: session.created_at(),
            last_activity: session.last_activity(),
        }
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
    default_session_id: String,
    max_turns: usize,
}

impl SessionManager {
    pub fn new(sessions: &SessionConfig, conversation: &ConversationConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: sessions.max_sessions,
            session_timeout: Duration::from_secs(sessions.idle_timeout_seconds),
            cleanup_interval: Duration::from_secs(sessions.cleanup_interval_seconds),
            default_session_id: sessions.default_session_id.clone(),
            max_turns: conversation.max_turns,
        }
    }

    /// Id used when a request names no session
    pub fn default_session_id(&self) -> &str {
        &self.default_session_id
    }

    /// Start a background task that periodically removes expired sessions
    ///
    /// Send `true` on the returned channel to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Session cleanup"
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Look up a session for an exchange, creating it on first use
    ///
    /// The session is touched while the map lock is held, so an expiry sweep
    /// cannot drop it between lookup and the start of the exchange.
    pub fn get_or_create(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        {
            let sessions = self.sessions.read();
            if let Some(session) = sessions.get(id) {
                session.touch();
                return Ok(session.clone());
            }
        }
        self.create(id)
    }

    /// Create a session with the given id, or return the existing one
    pub fn create(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if let Some(existing) = sessions.get(id) {
            existing.touch();
            return Ok(existing.clone());
        }

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Session limit reached");
                return Err(ServerError::SessionLimit(self.max_sessions));
            }
        }

        let session = Arc::new(Session::new(id, SessionMemory::new(self.max_turns)));
        sessions.insert(id.to_string(), session.clone());

        tracing::info!(session_id = %id, "Created session");

        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session, returning whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove expired sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Expired session");
        }
        expired.len()
    }

    /// Snapshot of every session, ordered by id
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .values()
            .map(|s| SessionInfo::from(s.as_ref()))
            .collect();
        infos.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        infos
    }
}
