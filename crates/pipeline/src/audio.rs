//! WAV inspection
//!
//! Only used to decide whether a payload contains speech before it is sent
//! to the transcription service; the service itself receives the original
//! bytes untouched.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::PipelineError;

/// Mono 16-bit PCM extracted from a WAV payload
#[derive(Debug, Clone, PartialEq)]
pub struct MonoPcm {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl MonoPcm {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// True when the payload carries a RIFF/WAVE header
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decode a WAV payload into mono 16-bit PCM
///
/// Returns `Ok(None)` for payloads that are not WAV at all (another container
/// the transcription service may still understand) and an error for WAV
/// payloads that cannot be decoded.
pub fn decode_wav(bytes: &[u8]) -> Result<Option<MonoPcm>, PipelineError> {
    if !is_wav(bytes) {
        return Ok(None);
    }

    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Audio(format!("Malformed WAV: {}", e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<i16> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = spec.bits_per_sample as i32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| scale_to_i16(v, bits)))
                .collect::<Result<_, _>>()
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>(),
    }
    .map_err(|e| PipelineError::Audio(format!("Malformed WAV samples: {}", e)))?;

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    };

    Ok(Some(MonoPcm {
        samples,
        sample_rate: spec.sample_rate,
    }))
}

fn scale_to_i16(value: i32, bits: i32) -> i16 {
    match bits.cmp(&16) {
        std::cmp::Ordering::Equal => value as i16,
        std::cmp::Ordering::Greater => (value >> (bits - 16)) as i16,
        std::cmp::Ordering::Less => (value << (16 - bits)) as i16,
    }
}
