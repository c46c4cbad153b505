use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use voice_turn_config::TtsConfig;
use voice_turn_core::TextToSpeech;

use crate::PipelineError;

/// Connection settings for the Coqui TTS server
#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    pub endpoint: String,
    pub speaker_id: String,
    pub language_id: String,
    pub timeout: Duration,
}

impl From<&TtsConfig> for HttpTtsConfig {
    fn from(config: &TtsConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            speaker_id: config.speaker_id.clone(),
            language_id: config.language_id.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Coqui TTS over `GET /api/tts`
pub struct CoquiHttpTts {
    client: Client,
    config: HttpTtsConfig,
}

impl CoquiHttpTts {
    pub fn new(config: &TtsConfig) -> Result<Self, PipelineError> {
        Self::with_config(HttpTtsConfig::from(config))
    }

    pub fn with_config(config: HttpTtsConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    async fn request(&self, text: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(format!("{}/api/tts", self.config.endpoint))
            .query(&[
                ("text", text),
                ("speaker_id", self.config.speaker_id.as_str()),
                ("style_wav", ""),
                ("language_id", self.config.language_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Tts("Synthesis request timed out".to_string())
                } else {
                    PipelineError::Tts(format!("TTS server unreachable: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tts(format!("Server error {}: {}", status, body)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Tts(format!("Failed to read audio: {}", e)))?;

        Ok(audio.to_vec())
    }
}

#[async_trait]
impl TextToSpeech for CoquiHttpTts {
    async fn synthesize(&self, text: &str) -> voice_turn_core::Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let audio = self.request(text).await?;
        tracing::debug!(chars = text.len(), bytes = audio.len(), "Synthesis complete");
        Ok(audio)
    }

    fn model_name(&self) -> &str {
        "coqui-tts"
    }
}
