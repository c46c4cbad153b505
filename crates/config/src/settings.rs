//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, ConversationConfig, LlmConfig, SessionConfig, SttConfig, TtsConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Session registry configuration
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Speech-to-text engine
    #[serde(default)]
    pub stt: SttConfig,

    /// Language model
    #[serde(default)]
    pub llm: LlmConfig,

    /// Text-to-speech engine
    #[serde(default)]
    pub tts: TtsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_conversation()?;
        self.validate_stages()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.timeout_seconds",
                "Timeout must be at least 1 second",
            ));
        }

        if server.max_upload_bytes == 0 {
            return Err(ConfigError::invalid(
                "server.max_upload_bytes",
                "Upload limit must be at least 1 byte",
            ));
        }

        // Auth validation in production
        if self.environment.is_production() && server.auth.enabled && server.auth.api_key.is_none()
        {
            return Err(ConfigError::invalid(
                "server.auth.api_key",
                "API key must be set when auth is enabled in production",
            ));
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        if self.conversation.max_turns == 0 {
            return Err(ConfigError::invalid(
                "conversation.max_turns",
                "Must keep at least one turn",
            ));
        }

        let sessions = &self.sessions;
        if sessions.max_sessions == 0 {
            return Err(ConfigError::invalid("sessions.max_sessions", "Must be at least 1"));
        }
        if sessions.idle_timeout_seconds == 0 || sessions.cleanup_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "sessions",
                "Idle timeout and cleanup interval must be at least 1 second",
            ));
        }
        if sessions.default_session_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "sessions.default_session_id",
                "Cannot be empty",
            ));
        }

        Ok(())
    }

    fn validate_stages(&self) -> Result<(), ConfigError> {
        let limits = [
            ("stt.max_concurrent", self.stt.max_concurrent),
            ("llm.max_concurrent", self.llm.max_concurrent),
            ("tts.max_concurrent", self.tts.max_concurrent),
        ];
        for (field, limit) in limits {
            if limit == 0 {
                return Err(ConfigError::invalid(field, "Must be at least 1"));
            }
        }

        let timeouts = [
            ("stt.timeout_ms", self.stt.timeout_ms),
            ("llm.timeout_ms", self.llm.timeout_ms),
            ("tts.timeout_ms", self.tts.timeout_ms),
        ];
        for (field, timeout) in timeouts {
            if timeout == 0 {
                return Err(ConfigError::invalid(field, "Must be at least 1ms"));
            }
        }

        if self.stt.vad_mode > 3 {
            return Err(ConfigError::invalid(
                "stt.vad_mode",
                format!("Must be between 0 and 3, got {}", self.stt.vad_mode),
            ));
        }

        let llm = &self.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }
        if !(0.0..=1.0).contains(&llm.top_p) || llm.top_p == 0.0 {
            return Err(ConfigError::invalid(
                "llm.top_p",
                format!("Must be in (0.0, 1.0], got {}", llm.top_p),
            ));
        }
        if llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "Must be at least 1"));
        }

        for (field, endpoint) in [
            ("stt.endpoint", &self.stt.endpoint),
            ("llm.endpoint", &llm.endpoint),
            ("tts.endpoint", &self.tts.endpoint),
        ] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::invalid(
                    field,
                    format!("Must be an http(s) URL, got '{}'", endpoint),
                ));
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout in seconds for the session and health routes; `/converse`
    /// and `/reset` are bounded only by the stage client timeouts
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Largest accepted audio upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Enable authentication (set to false for development)
    #[serde(default)]
    pub enabled: bool,

    /// API key for bearer authentication (set via VOICE_TURN__SERVER__AUTH__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Paths that bypass authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/ready".to_string(),
        "/metrics".to_string(),
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    120
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_enabled: true,
            // Empty by default - must be explicitly configured for production
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_TURN__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_TURN")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitPolicy;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.conversation.max_turns, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        settings.server.port = 0;
        assert!(settings.validate_server().is_err());
        settings.server.port = 8080;

        settings.server.timeout_seconds = 0;
        assert!(settings.validate_server().is_err());
        settings.server.timeout_seconds = 30;

        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_production_auth_validation() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        settings.server.auth.enabled = true;
        settings.server.auth.api_key = None;

        assert!(settings.validate_server().is_err());

        settings.server.auth.api_key = Some("secret-key".to_string());
        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_conversation_validation() {
        let mut settings = Settings::default();
        settings.conversation.max_turns = 0;
        assert!(settings.validate_conversation().is_err());

        settings.conversation.max_turns = 3;
        settings.sessions.default_session_id = "  ".to_string();
        assert!(settings.validate_conversation().is_err());
    }

    #[test]
    fn test_stage_validation() {
        let mut settings = Settings::default();

        settings.stt.vad_mode = 4;
        assert!(settings.validate_stages().is_err());
        settings.stt.vad_mode = 3;
        assert!(settings.validate_stages().is_ok());

        settings.llm.max_concurrent = 0;
        assert!(settings.validate_stages().is_err());
        settings.llm.max_concurrent = 2;

        settings.llm.top_p = 0.0;
        assert!(settings.validate_stages().is_err());
        settings.llm.top_p = 0.9;

        settings.tts.endpoint = "localhost:5002".to_string();
        assert!(settings.validate_stages().is_err());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "conversation:\n  max_turns: 8\n  commit_policy: after_synthesis\nserver:\n  port: 9001\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("staging.yaml"), "server:\n  port: 9002\n").unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.conversation.max_turns, 8);
        assert_eq!(settings.conversation.commit_policy, CommitPolicy::AfterSynthesis);
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.llm.max_tokens, 256);

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.server.port, 9002);
        assert_eq!(settings.conversation.max_turns, 8);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "conversation:\n  max_turns: 0\n").unwrap();

        let err = load_settings_from(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "conversation.max_turns"));
    }
}
