//! Stage identifiers and per-stage latency

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One of the three external engines invoked per exchange, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SpeechToText,
    LanguageModel,
    TextToSpeech,
}

impl Stage {
    /// Short label used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SpeechToText => "stt",
            Stage::LanguageModel => "llm",
            Stage::TextToSpeech => "tts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock latency of a completed exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub transcription: Duration,
    pub generation: Duration,
    pub synthesis: Duration,
    /// From the start of transcription to the end of synthesis
    pub total: Duration,
}
