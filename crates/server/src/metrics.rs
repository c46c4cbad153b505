//! Prometheus metrics
//!
//! Metrics go through the `metrics` facade; the Prometheus recorder is
//! installed once by the binary and rendered on `GET /metrics`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use voice_turn_agent::ExchangeOutcome;
use voice_turn_core::Stage;

use crate::state::AppState;

pub const REQUESTS_TOTAL: &str = "voice_turn_requests_total";
pub const SHORT_CIRCUITS_TOTAL: &str = "voice_turn_short_circuits_total";
pub const STAGE_ERRORS_TOTAL: &str = "voice_turn_stage_errors_total";
pub const STT_LATENCY: &str = "voice_turn_stt_latency_seconds";
pub const LLM_LATENCY: &str = "voice_turn_llm_latency_seconds";
pub const TTS_LATENCY: &str = "voice_turn_tts_latency_seconds";
pub const TOTAL_LATENCY: &str = "voice_turn_total_latency_seconds";

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_latency_seconds".to_string()), LATENCY_BUCKETS)?
        .install_recorder()
}

/// Count a request to an endpoint
pub fn record_request(endpoint: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint).increment(1);
}

/// Record the latencies of a finished exchange
pub fn record_exchange(outcome: &ExchangeOutcome) {
    match outcome {
        ExchangeOutcome::NoSpeech { transcription_time } => {
            metrics::counter!(SHORT_CIRCUITS_TOTAL).increment(1);
            metrics::histogram!(STT_LATENCY).record(transcription_time.as_secs_f64());
        }
        ExchangeOutcome::Reply { timings, .. } => {
            metrics::histogram!(STT_LATENCY).record(timings.transcription.as_secs_f64());
            metrics::histogram!(LLM_LATENCY).record(timings.generation.as_secs_f64());
            metrics::histogram!(TTS_LATENCY).record(timings.synthesis.as_secs_f64());
            metrics::histogram!(TOTAL_LATENCY).record(timings.total.as_secs_f64());
        }
    }
}

/// Count a failed exchange by stage
pub fn record_error(stage: Option<Stage>) {
    let stage = stage.map(|s| s.as_str()).unwrap_or("other");
    metrics::counter!(STAGE_ERRORS_TOTAL, "stage" => stage).increment(1);
}

/// Render metrics in the Prometheus text format
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
