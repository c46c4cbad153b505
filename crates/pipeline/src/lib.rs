//! Speech stage adapters
//!
//! This crate provides the audio-facing engines of an exchange:
//! - WAV inspection (mono PCM extraction)
//! - Voice Activity Detection gate (WebRTC VAD)
//! - Speech-to-Text over a Whisper-compatible HTTP service
//! - Text-to-Speech over a Coqui TTS server

pub mod audio;
pub mod stt;
pub mod tts;
pub mod vad;

pub use audio::{decode_wav, MonoPcm};
pub use stt::{HttpSttConfig, WhisperHttpStt};
pub use tts::{CoquiHttpTts, HttpTtsConfig};
pub use vad::{SpeechCheck, SpeechGate};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("VAD error: {0}")]
    Vad(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<PipelineError> for voice_turn_core::Error {
    fn from(err: PipelineError) -> Self {
        use voice_turn_core::Error;

        match err {
            PipelineError::Vad(msg) | PipelineError::Audio(msg) => Error::Audio(msg),
            PipelineError::Stt(msg) => Error::Stt(msg),
            PipelineError::Tts(msg) => Error::Tts(msg),
            PipelineError::Configuration(msg) => Error::Configuration(msg),
        }
    }
}
