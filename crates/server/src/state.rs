//! Application State
//!
//! Shared state across all handlers. The engines are built once at start-up
//! and shared by every session through the orchestrator.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use voice_turn_agent::{StageLimits, TurnOrchestrator};
use voice_turn_config::Settings;
use voice_turn_llm::OllamaBackend;
use voice_turn_pipeline::{CoquiHttpTts, WhisperHttpStt};

use crate::session::SessionManager;
use crate::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, orchestrator: TurnOrchestrator) -> Self {
        let sessions = SessionManager::new(&config.sessions, &config.conversation);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            orchestrator: Arc::new(orchestrator),
            metrics: None,
        }
    }

    /// Build the HTTP-backed engines described by the settings
    pub fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let orchestrator = build_orchestrator(&config)?;
        Ok(Self::new(config, orchestrator))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Construct the three engines and wire them into an orchestrator
pub fn build_orchestrator(config: &Settings) -> Result<TurnOrchestrator, ServerError> {
    let stt = WhisperHttpStt::new(&config.stt)
        .map_err(|e| ServerError::Internal(format!("Failed to create STT engine: {}", e)))?;
    let llm = OllamaBackend::new(&config.llm)
        .map_err(|e| ServerError::Internal(format!("Failed to create LLM backend: {}", e)))?;
    let tts = CoquiHttpTts::new(&config.tts)
        .map_err(|e| ServerError::Internal(format!("Failed to create TTS engine: {}", e)))?;
    let limits =
        StageLimits::from_settings(config).map_err(|e| ServerError::Internal(e.to_string()))?;

    tracing::info!(
        stt = %config.stt.endpoint,
        llm = %config.llm.endpoint,
        llm_model = %config.llm.model,
        tts = %config.tts.endpoint,
        commit_policy = ?config.conversation.commit_policy,
        "Stage engines configured"
    );

    Ok(TurnOrchestrator::new(Arc::new(stt), Arc::new(llm), Arc::new(tts))
        .with_limits(limits)
        .with_commit_policy(config.conversation.commit_policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_default_settings() {
        let state = AppState::from_settings(Settings::default()).unwrap();
        assert_eq!(state.sessions.count(), 0);
        assert_eq!(state.sessions.default_session_id(), "default");
        assert!(state.metrics.is_none());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut settings = Settings::default();
        settings.llm.max_concurrent = 0;
        assert!(AppState::from_settings(settings).is_err());
    }
}
