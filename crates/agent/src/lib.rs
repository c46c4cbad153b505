//! Conversation sessions and turn orchestration
//!
//! Features:
//! - Bounded session memory rendered into a completion prompt
//! - Sessions with one exchange at a time
//! - Orchestration of transcription, generation and synthesis with
//!   per-stage latency and per-engine concurrency limits

pub mod memory;
pub mod orchestrator;
pub mod session;

pub use memory::SessionMemory;
pub use orchestrator::{ExchangeOutcome, ResetStatus, StageLimits, TurnOrchestrator};
pub use session::{ExchangeGuard, Session, SessionState};

use thiserror::Error;
use voice_turn_core::Stage;

/// Agent errors
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// A stage engine failed; the description is the engine's own
    #[error(transparent)]
    Stage(#[from] voice_turn_core::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Stage that failed, if the error came from an engine
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AgentError::Stage(err) => err.stage(),
            AgentError::Configuration(_) => None,
        }
    }
}
