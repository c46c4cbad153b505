//! Speech processing traits

use async_trait::async_trait;

use crate::{Result, Transcription};

/// Speech-to-Text interface
///
/// Implementations:
/// - `WhisperHttpStt` - Whisper-compatible transcription service behind a VAD gate
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(WhisperHttpStt::new(&settings.stt)?);
/// match stt.transcribe(&audio_bytes).await? {
///     Transcription::NoSpeech => println!("nothing heard"),
///     Transcription::Speech(text) => println!("Transcribed: {}", text),
/// }
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe one complete audio payload
    ///
    /// # Arguments
    /// * `audio` - Raw audio bytes; the container format is sniffed by the engine
    ///
    /// # Returns
    /// `Transcription::NoSpeech` for empty or unintelligible audio,
    /// otherwise the trimmed transcript. Malformed audio is an error.
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface
///
/// Implementations:
/// - `CoquiHttpTts` - Coqui TTS server
///
/// Given empty or whitespace-only text, implementations return empty bytes
/// without contacting the underlying engine.
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text to encoded audio (WAV for the bundled adapter)
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
