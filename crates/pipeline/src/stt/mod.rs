//! Speech-to-Text
//!
//! Transcription is delegated to a Whisper-compatible HTTP service
//! (faster-whisper-server, speaches, whisper.cpp server). Payloads the
//! speech gate rejects never leave the process.

mod http_backend;

pub use http_backend::{HttpSttConfig, WhisperHttpStt};
