//! Voice Activity Detection gate
//!
//! Runs WebRTC VAD over a WAV payload in 30ms frames before the payload is
//! sent for transcription. A payload with no voiced frame never reaches the
//! transcription service.

use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::audio::decode_wav;
use crate::PipelineError;

/// Frame length fed to the detector
pub const FRAME_MS: u32 = 30;

/// Outcome of inspecting a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCheck {
    /// Zero-length payload
    Empty,
    /// Decodable WAV with no voiced frame
    Silent,
    /// At least one voiced frame
    Voiced,
    /// Not inspectable here (non-WAV container, unsupported rate, or gate disabled)
    Undetermined,
}

impl SpeechCheck {
    /// Whether the payload should be sent to the transcription service
    pub fn may_contain_speech(&self) -> bool {
        matches!(self, SpeechCheck::Voiced | SpeechCheck::Undetermined)
    }
}

/// Speech gate built from the STT settings
#[derive(Debug, Clone, Copy)]
pub struct SpeechGate {
    enabled: bool,
    mode: u8,
}

impl SpeechGate {
    pub fn new(enabled: bool, mode: u8) -> Result<Self, PipelineError> {
        if mode > 3 {
            return Err(PipelineError::Configuration(format!(
                "VAD mode must be 0-3, got {}",
                mode
            )));
        }
        Ok(Self { enabled, mode })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            mode: 2,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Inspect a payload
    ///
    /// The detector is created per call; it is not `Send` and holds no
    /// state worth keeping between exchanges.
    pub fn check(&self, audio: &[u8]) -> Result<SpeechCheck, PipelineError> {
        if audio.is_empty() {
            return Ok(SpeechCheck::Empty);
        }
        if !self.enabled {
            return Ok(SpeechCheck::Undetermined);
        }

        let pcm = match decode_wav(audio)? {
            Some(pcm) => pcm,
            None => return Ok(SpeechCheck::Undetermined),
        };

        let rate = match pcm.sample_rate {
            8000 => SampleRate::Rate8kHz,
            16000 => SampleRate::Rate16kHz,
            32000 => SampleRate::Rate32kHz,
            48000 => SampleRate::Rate48kHz,
            other => {
                tracing::debug!(sample_rate = other, "Sample rate not supported by VAD, skipping gate");
                return Ok(SpeechCheck::Undetermined);
            }
        };

        let frame_len = (pcm.sample_rate * FRAME_MS / 1000) as usize;
        let mut vad = Vad::new_with_rate(rate);
        vad.set_mode(self.vad_mode());

        let mut frames = 0usize;
        for frame in pcm.samples.chunks_exact(frame_len) {
            frames += 1;
            let voiced = vad.is_voice_segment(frame).map_err(|_| {
                PipelineError::Vad(format!("Invalid frame of {} samples", frame.len()))
            })?;
            if voiced {
                tracing::debug!(frame = frames, "Voiced frame detected");
                return Ok(SpeechCheck::Voiced);
            }
        }

        tracing::debug!(frames, "No voiced frame in payload");
        Ok(SpeechCheck::Silent)
    }

    fn vad_mode(&self) -> VadMode {
        match self.mode {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            _ => VadMode::VeryAggressive,
        }
    }
}

impl Default for SpeechGate {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: 2,
        }
    }
}
