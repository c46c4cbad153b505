//! Language model integration
//!
//! Single-shot, non-streaming completion of a rendered conversation prompt
//! against a local Ollama server.

pub mod backend;

pub use backend::{OllamaBackend, OllamaConfig};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for voice_turn_core::Error {
    fn from(err: LlmError) -> Self {
        voice_turn_core::Error::Llm(err.to_string())
    }
}
