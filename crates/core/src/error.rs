//! Error types shared by every stage of the exchange

use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Each stage adapter converts its own error into one of the stage
/// variants, keeping the original description as the payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Stage that raised this error, if it came from one of the three engines
    pub fn stage(&self) -> Option<crate::Stage> {
        match self {
            Error::Stt(_) | Error::Audio(_) => Some(crate::Stage::SpeechToText),
            Error::Llm(_) => Some(crate::Stage::LanguageModel),
            Error::Tts(_) => Some(crate::Stage::TextToSpeech),
            _ => None,
        }
    }
}
