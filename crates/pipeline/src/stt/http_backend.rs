use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use voice_turn_config::SttConfig;
use voice_turn_core::{SpeechToText, Transcription};

use crate::audio::is_wav;
use crate::vad::SpeechGate;
use crate::PipelineError;

/// Connection settings for the transcription service
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    pub endpoint: String,
    pub model: String,
    /// Empty lets the service detect the language
    pub language: String,
    pub timeout: Duration,
}

impl From<&SttConfig> for HttpSttConfig {
    fn from(config: &SttConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper transcription over the OpenAI-compatible
/// `/v1/audio/transcriptions` endpoint
pub struct WhisperHttpStt {
    client: Client,
    config: HttpSttConfig,
    gate: SpeechGate,
}

impl WhisperHttpStt {
    pub fn new(config: &SttConfig) -> Result<Self, PipelineError> {
        let gate = SpeechGate::new(config.vad_enabled, config.vad_mode)?;
        Self::with_gate(HttpSttConfig::from(config), gate)
    }

    pub fn with_gate(config: HttpSttConfig, gate: SpeechGate) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            gate,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.config.endpoint)
    }

    async fn request(&self, audio: &[u8]) -> Result<String, PipelineError> {
        let file_name = if is_wav(audio) { "audio.wav" } else { "audio" };
        let part = Part::bytes(audio.to_vec()).file_name(file_name);

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "json");
        if !self.config.language.is_empty() {
            form = form.text("language", self.config.language.clone());
        }

        let response = self
            .client
            .post(self.api_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Stt("Transcription request timed out".to_string())
                } else {
                    PipelineError::Stt(format!("Transcription service unreachable: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Stt(format!("Server error {}: {}", status, body)));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(format!("Invalid response: {}", e)))?;

        Ok(parsed.text)
    }
}

#[async_trait]
impl SpeechToText for WhisperHttpStt {
    async fn transcribe(&self, audio: &[u8]) -> voice_turn_core::Result<Transcription> {
        let check = self.gate.check(audio)?;
        if !check.may_contain_speech() {
            tracing::debug!(?check, bytes = audio.len(), "Speech gate rejected payload");
            return Ok(Transcription::NoSpeech);
        }

        let text = self.request(audio).await?;
        let transcription = Transcription::from_text(text);
        tracing::debug!(
            speech = transcription.is_speech(),
            chars = transcription.text().len(),
            "Transcription complete"
        );
        Ok(transcription)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
