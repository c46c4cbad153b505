//! Conversation and session configuration

use serde::{Deserialize, Serialize};

/// When the user/assistant pair is committed to session memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit as soon as generation succeeds; a synthesis failure keeps the pair
    #[default]
    AfterGeneration,
    /// Commit only once synthesis has also succeeded
    AfterSynthesis,
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum user/assistant pairs kept; history holds at most twice this many messages
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default)]
    pub commit_policy: CommitPolicy,
}

fn default_max_turns() -> usize {
    5
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            commit_policy: CommitPolicy::default(),
        }
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrently tracked sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Period of the expiry sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Session used when a request carries no session id
    #[serde(default = "default_session_id")]
    pub default_session_id: String,
}

fn default_max_sessions() -> usize {
    100
}
fn default_idle_timeout() -> u64 {
    3600 // 1 hour
}
fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}
fn default_session_id() -> String {
    "default".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_seconds: default_idle_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
            default_session_id: default_session_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_defaults() {
        let config = ConversationConfig::default();
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.commit_policy, CommitPolicy::AfterGeneration);
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_session_id, "default");
        assert!(config.cleanup_interval_seconds < config.idle_timeout_seconds);
    }
}
