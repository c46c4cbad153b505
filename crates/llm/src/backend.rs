//! Ollama backend
//!
//! The conversation prompt is rendered upstream, so requests go to
//! `/api/generate` in raw mode: Ollama applies no chat template and the
//! model simply continues the text after the trailing `Assistant:` cue.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use voice_turn_config::LlmConfig;
use voice_turn_core::LanguageModel;

use crate::LlmError;

/// Backend configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub model: String,
    pub endpoint: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
}

impl From<&LlmConfig> for OllamaConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::with_config(OllamaConfig::from(config))
    }

    /// Create a backend from an explicit configuration
    ///
    /// Returns an error instead of panicking when the HTTP client cannot be built.
    pub fn with_config(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> OllamaGenerateRequest<'a> {
        OllamaGenerateRequest {
            model: &self.config.model,
            prompt,
            raw: true,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens as i32,
            },
        }
    }

    async fn execute_request(&self, request: &OllamaGenerateRequest<'_>) -> Result<OllamaGenerateResponse, LlmError> {
        let response = self.client
            .post(self.api_url("/generate"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(format!("{}: {}", self.config.model, error)));
            }
            return Err(LlmError::Api(format!("Server error {}: {}", status, error)));
        }

        response.json().await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Complete a prompt, returning the backend error type
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let start = Instant::now();
        let request = self.build_request(prompt);
        let result = self.execute_request(&request).await?;

        tracing::debug!(
            model = %self.config.model,
            tokens = result.eval_count.unwrap_or(0),
            done = result.done,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );

        Ok(result.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn generate(&self, prompt: &str) -> voice_turn_core::Result<String> {
        Ok(self.complete(prompt).await?)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    raw: bool,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn backend_for(server: &MockServer) -> OllamaBackend {
        let config = LlmConfig {
            endpoint: server.base_url(),
            ..LlmConfig::default()
        };
        OllamaBackend::new(&config).unwrap()
    }

    #[test]
    fn test_config_from_settings() {
        let config = OllamaConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_tokens, 256);
    }

    #[tokio::test]
    async fn sends_raw_prompt_and_returns_completion_verbatim() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(
                        r#"{
                            "prompt": "User: hello\nAssistant:",
                            "raw": true,
                            "stream": false,
                            "options": { "num_predict": 256 }
                        }"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "model": "llama3",
                    "response": " Hi! How can I help?\n",
                    "done": true,
                    "eval_count": 7
                }));
            })
            .await;

        let llm = backend_for(&server);
        let reply = llm.generate("User: hello\nAssistant:").await.unwrap();

        assert_eq!(reply, " Hi! How can I help?\n");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_maps_to_llm_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("out of memory");
            })
            .await;

        let llm = backend_for(&server);
        let err = llm.generate("User: hi\nAssistant:").await.unwrap_err();

        match err {
            voice_turn_core::Error::Llm(msg) => assert!(msg.contains("out of memory")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_model_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body(r#"{"error":"model not found"}"#);
            })
            .await;

        let llm = backend_for(&server);
        let err = llm.complete("User: hi\nAssistant:").await.unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body("not json");
            })
            .await;

        let llm = backend_for(&server);
        let err = llm.complete("User: hi\nAssistant:").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn availability_follows_tags_endpoint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(serde_json::json!({ "models": [] }));
            })
            .await;

        let llm = backend_for(&server);
        assert!(llm.is_available().await);

        let offline = OllamaBackend::with_config(OllamaConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert!(!offline.is_available().await);
    }
}
