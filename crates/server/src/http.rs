//! HTTP Endpoints
//!
//! - `POST /converse` multipart upload (field `audio`), one exchange
//! - `POST /reset` clears the session's conversation
//! - `GET /health`, `GET /ready`, `GET /metrics`
//! - `GET /api/sessions`, `GET|DELETE /api/sessions/:id`
//!
//! The session is chosen by the `X-Session-Id` header or `session_id` query
//! parameter, falling back to the configured default session.

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use voice_turn_agent::{ExchangeOutcome, ResetStatus};

use crate::auth::auth_middleware;
use crate::metrics::{metrics_handler, record_error, record_exchange, record_request};
use crate::session::SessionInfo;
use crate::state::AppState;
use crate::ServerError;

pub const SESSION_HEADER: &str = "x-session-id";
const AUDIO_FIELD: &str = "audio";
const MAX_SESSION_ID_LEN: usize = 128;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let body_limit = server.max_upload_bytes;
    let timeout = Duration::from_secs(server.timeout_seconds);

    // Exchange endpoints: a started exchange runs to completion or stage failure
    let exchange_routes = Router::new()
        .route("/converse", post(converse))
        .route("/reset", post(reset));

    let service_routes = Router::new()
        // Session endpoints
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout));

    Router::new()
        .merge(exchange_routes)
        .merge(service_routes)
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - disabled: permissive (development only)
/// - no valid origins configured: localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(SESSION_HEADER),
        ]);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return base.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    base.allow_origin(parsed_origins).allow_credentials(true)
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    session_id: Option<String>,
}

fn non_blank(id: &str) -> Option<&str> {
    Some(id.trim()).filter(|id| !id.is_empty())
}

/// Pick the session id from the header, then the query, then the default
fn resolve_session_id(
    state: &AppState,
    headers: &HeaderMap,
    query: &SessionQuery,
) -> Result<String, ServerError> {
    let from_header = headers
        .get(SESSION_HEADER)
        .map(|v| {
            v.to_str()
                .map_err(|_| ServerError::InvalidRequest("Session id must be ASCII".to_string()))
        })
        .transpose()?;

    let requested = from_header
        .and_then(non_blank)
        .or_else(|| query.session_id.as_deref().and_then(non_blank));

    match requested {
        Some(id) if id.len() > MAX_SESSION_ID_LEN => Err(ServerError::InvalidRequest(format!(
            "Session id longer than {} characters",
            MAX_SESSION_ID_LEN
        ))),
        Some(id) => Ok(id.to_string()),
        None => Ok(state.sessions.default_session_id().to_string()),
    }
}

/// Body of a `/converse` reply; latencies in seconds
#[derive(Debug, Serialize)]
pub struct ConverseResponse {
    pub text: String,
    /// Base64 of the synthesized audio; empty when nothing was said
    pub audio: String,
    pub transcription_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
}

impl From<&ExchangeOutcome> for ConverseResponse {
    fn from(outcome: &ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::NoSpeech { transcription_time } => Self {
                text: String::new(),
                audio: String::new(),
                transcription_time: transcription_time.as_secs_f64(),
                llm_time: None,
                tts_time: None,
                total_time: None,
            },
            ExchangeOutcome::Reply {
                text,
                audio,
                timings,
                ..
            } => Self {
                text: text.clone(),
                audio: BASE64.encode(audio),
                transcription_time: timings.transcription.as_secs_f64(),
                llm_time: Some(timings.generation.as_secs_f64()),
                tts_time: Some(timings.synthesis.as_secs_f64()),
                total_time: Some(timings.total.as_secs_f64()),
            },
        }
    }
}

async fn read_audio_field(multipart: &mut Multipart) -> Result<Vec<u8>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            let bytes = field.bytes().await.map_err(|e| {
                ServerError::InvalidRequest(format!("Failed to read audio upload: {}", e))
            })?;
            return Ok(bytes.to_vec());
        }
    }

    Err(ServerError::InvalidRequest(format!(
        "Missing '{}' field",
        AUDIO_FIELD
    )))
}

/// Run one exchange
async fn converse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
    mut multipart: Multipart,
) -> Result<Json<ConverseResponse>, ServerError> {
    record_request("converse");

    let session_id = resolve_session_id(&state, &headers, &query)?;
    let audio = read_audio_field(&mut multipart).await?;
    let session = state.sessions.get_or_create(&session_id)?;

    tracing::debug!(session_id = %session_id, bytes = audio.len(), "Converse request");

    match state.orchestrator.converse(&session, &audio).await {
        Ok(outcome) => {
            record_exchange(&outcome);
            Ok(Json(ConverseResponse::from(&outcome)))
        }
        Err(e) => {
            record_error(e.stage());
            Err(e.into())
        }
    }
}

/// Clear the session's conversation
async fn reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    record_request("reset");

    let session_id = resolve_session_id(&state, &headers, &query)?;
    if let Some(session) = state.sessions.get(&session_id) {
        state.orchestrator.reset(&session).await;
    }

    Ok(Json(serde_json::json!({ "status": ResetStatus::STATUS })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::SessionNotFound(id.clone()))?;

    Ok(Json(SessionInfo::from(session.as_ref())))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// Liveness only
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the language model answers and the session table is reported
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let llm_available = state.orchestrator.language_model().is_available().await;
    let status = if llm_available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if llm_available { "ready" } else { "not_ready" },
            "llm_available": llm_available,
            "sessions": state.sessions.count(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_turn_config::Settings;

    #[test]
    fn test_router_creation() {
        let state = AppState::from_settings(Settings::default()).unwrap();
        let _ = create_router(state);
    }

    #[test]
    fn test_session_id_resolution() {
        let state = AppState::from_settings(Settings::default()).unwrap();
        let mut headers = HeaderMap::new();
        let query = SessionQuery {
            session_id: Some("from-query".into()),
        };

        assert_eq!(
            resolve_session_id(&state, &headers, &SessionQuery::default()).unwrap(),
            "default"
        );
        assert_eq!(resolve_session_id(&state, &headers, &query).unwrap(), "from-query");

        headers.insert(SESSION_HEADER, HeaderValue::from_static(" from-header "));
        assert_eq!(resolve_session_id(&state, &headers, &query).unwrap(), "from-header");

        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert_eq!(
            resolve_session_id(&state, &headers, &SessionQuery::default()).unwrap(),
            "default"
        );
    }

    #[test]
    fn test_short_circuit_response_omits_later_timings() {
        let outcome = ExchangeOutcome::NoSpeech {
            transcription_time: Duration::from_millis(250),
        };
        let json = serde_json::to_value(ConverseResponse::from(&outcome)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "text": "", "audio": "", "transcription_time": 0.25 })
        );
    }
}
