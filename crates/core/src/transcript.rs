//! Transcription result

use serde::{Deserialize, Serialize};

/// Outcome of the speech-to-text stage
///
/// "No speech" is a first-class state rather than an empty string, so the
/// orchestrator's short-circuit branch is an explicit match arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Transcription {
    /// Empty audio, or nothing intelligible in it
    NoSpeech,
    /// Trimmed, non-empty transcript
    Speech(String),
}

impl Transcription {
    /// Build from raw engine output; trims and maps blank text to `NoSpeech`.
    pub fn from_text(text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        if text.is_empty() {
            Transcription::NoSpeech
        } else {
            Transcription::Speech(text.to_string())
        }
    }

    pub fn is_speech(&self) -> bool {
        matches!(self, Transcription::Speech(_))
    }

    /// Transcript text, `""` when no speech was detected
    pub fn text(&self) -> &str {
        match self {
            Transcription::NoSpeech => "",
            Transcription::Speech(text) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        assert_eq!(Transcription::from_text("   "), Transcription::NoSpeech);
        assert_eq!(
            Transcription::from_text("  hello world \n"),
            Transcription::Speech("hello world".to_string())
        );
        assert!(!Transcription::NoSpeech.is_speech());
        assert_eq!(Transcription::NoSpeech.text(), "");
    }
}
