//! Core traits and types for the voice turn service
//!
//! This crate provides foundational types used across all other crates:
//! - Capability traits for the external engines (STT, LLM, TTS)
//! - Conversation turns and roles
//! - The tagged transcription result
//! - Error types

pub mod conversation;
pub mod error;
pub mod stage;
pub mod traits;
pub mod transcript;

pub use conversation::{Turn, TurnRole};
pub use error::{Error, Result};
pub use stage::{Stage, StageTimings};
pub use transcript::Transcription;

pub use traits::{LanguageModel, SpeechToText, TextToSpeech};
