//! Stage engine configuration
//!
//! Endpoints and per-stage concurrency limits for the three external
//! engines. `max_concurrent` bounds in-flight calls into an engine across
//! all sessions; 1 serializes the engine entirely.

use serde::{Deserialize, Serialize};

/// Speech-to-text engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Base URL of the Whisper-compatible transcription service
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,

    /// Model name sent with each request
    #[serde(default = "default_stt_model")]
    pub model: String,

    /// Language hint (ISO 639-1); empty lets the service detect it
    #[serde(default = "default_stt_language")]
    pub language: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_stt_timeout")]
    pub timeout_ms: u64,

    /// Run WebRTC VAD on WAV payloads before contacting the service
    #[serde(default = "default_true")]
    pub vad_enabled: bool,

    /// VAD aggressiveness, 0 (least) to 3 (most)
    #[serde(default = "default_vad_mode")]
    pub vad_mode: u8,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_stt_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_stt_model() -> String {
    "Systran/faster-whisper-small".to_string()
}
fn default_stt_language() -> String {
    "en".to_string()
}
fn default_stt_timeout() -> u64 {
    30000
}
fn default_vad_mode() -> u8 {
    2
}
fn default_max_concurrent() -> usize {
    1
}
fn default_true() -> bool {
    true
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            model: default_stt_model(),
            language: default_stt_language(),
            timeout_ms: default_stt_timeout(),
            vad_enabled: true,
            vad_mode: default_vad_mode(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in milliseconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3:8b-instruct-q4_K_M".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_max_tokens() -> usize {
    256
}
fn default_llm_timeout() -> u64 {
    60000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Text-to-speech engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the Coqui TTS server
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// Speaker for multi-speaker models; empty for single-speaker models
    #[serde(default)]
    pub speaker_id: String,

    /// Language for multilingual models; empty otherwise
    #[serde(default)]
    pub language_id: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_tts_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_tts_endpoint() -> String {
    "http://127.0.0.1:5002".to_string()
}
fn default_tts_timeout() -> u64 {
    30000
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            speaker_id: String::new(),
            language_id: String::new(),
            timeout_ms: default_tts_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}
