//! Text-to-Speech
//!
//! Synthesis is delegated to a Coqui TTS server. The returned bytes are the
//! WAV produced by the server, passed through untouched.

mod http_backend;

pub use http_backend::{CoquiHttpTts, HttpTtsConfig};
