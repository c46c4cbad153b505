//! Core traits for the voice turn service
//!
//! The three engines implement these traits so that:
//! - Backends can be swapped without touching the orchestrator
//! - Tests can substitute stubs
//! - One long-lived instance per process is shared by handle
//!
//! ```text
//! Speech Processing:
//!   - SpeechToText: Audio → Transcription
//!   - TextToSpeech: Text → Audio
//!
//! Language Models:
//!   - LanguageModel: Prompt → Completion
//! ```

mod speech;
mod llm;

pub use speech::{SpeechToText, TextToSpeech};
pub use llm::LanguageModel;
