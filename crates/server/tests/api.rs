use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use voice_turn_agent::TurnOrchestrator;
use voice_turn_config::Settings;
use voice_turn_core::{Error, LanguageModel, SpeechToText, TextToSpeech, Transcription};
use voice_turn_server::{create_router, AppState};

const BOUNDARY: &str = "voice-turn-test-boundary";

struct EchoStt;

#[async_trait]
impl SpeechToText for EchoStt {
    async fn transcribe(&self, audio: &[u8]) -> voice_turn_core::Result<Transcription> {
        Ok(Transcription::from_text(String::from_utf8_lossy(audio)))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

struct StubLlm {
    fail: bool,
}

#[async_trait]
impl LanguageModel for StubLlm {
    async fn generate(&self, _prompt: &str) -> voice_turn_core::Result<String> {
        if self.fail {
            return Err(Error::Llm("Server error 500: out of memory".into()));
        }
        Ok("R".to_string())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

struct StubTts;

#[async_trait]
impl TextToSpeech for StubTts {
    async fn synthesize(&self, text: &str) -> voice_turn_core::Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(b"AUDIO".to_vec())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Synthesis that takes longer than the configured request timeout
struct SlowTts {
    delay: Duration,
    fail: bool,
}

#[async_trait]
impl TextToSpeech for SlowTts {
    async fn synthesize(&self, _text: &str) -> voice_turn_core::Result<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(Error::Tts("Server error 503: voice busy".into()));
        }
        Ok(b"AUDIO".to_vec())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

fn slow_synthesis_app(fail: bool) -> (AppState, Router) {
    let mut settings = Settings::default();
    settings.server.timeout_seconds = 1;
    let orchestrator = TurnOrchestrator::new(
        Arc::new(EchoStt),
        Arc::new(StubLlm { fail: false }),
        Arc::new(SlowTts {
            delay: Duration::from_millis(1500),
            fail,
        }),
    );
    let state = AppState::new(settings, orchestrator);
    (state.clone(), create_router(state))
}

fn state_with(settings: Settings, llm_fails: bool) -> AppState {
    let orchestrator = TurnOrchestrator::new(
        Arc::new(EchoStt),
        Arc::new(StubLlm { fail: llm_fails }),
        Arc::new(StubTts),
    );
    AppState::new(settings, orchestrator)
}

fn app(llm_fails: bool) -> (AppState, Router) {
    let state = state_with(Settings::default(), llm_fails);
    (state.clone(), create_router(state))
}

fn multipart_body(field: &str, audio: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"clip.wav\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn converse_request(uri: &str, audio: &[u8]) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("audio", audio)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_liveness() {
    let (_, app) = app(false);
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn converse_returns_reply_and_timings() {
    let (state, app) = app(false);
    let response = app
        .oneshot(converse_request("/converse", b"hello there"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["text"], "R");
    assert_eq!(body["audio"], "QVVESU8=");
    for key in ["transcription_time", "llm_time", "tts_time", "total_time"] {
        assert!(body[key].as_f64().is_some(), "missing {key}");
    }

    let session = state.sessions.get("default").unwrap();
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "hello there");
    assert_eq!(history[1].content, "R");
}

#[tokio::test]
async fn silence_returns_only_transcription_time() {
    let (state, app) = app(false);
    let response = app.oneshot(converse_request("/converse", b"")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let object = body.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["audio", "text", "transcription_time"]);
    assert_eq!(body["text"], "");
    assert_eq!(body["audio"], "");

    assert_eq!(state.sessions.get("default").unwrap().message_count(), 0);
}

#[tokio::test]
async fn stage_failure_is_500_with_detail() {
    let (state, app) = app(true);
    let response = app
        .oneshot(converse_request("/converse", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "detail": "LLM error: Server error 500: out of memory" })
    );
    assert_eq!(state.sessions.get("default").unwrap().message_count(), 0);
}

#[tokio::test]
async fn missing_audio_field_is_bad_request() {
    let (_, app) = app(false);
    let request = Request::post("/converse")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("file", b"hello")))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_clears_only_the_named_session() {
    let (state, app) = app(false);

    let mut request = converse_request("/converse", b"first");
    request
        .headers_mut()
        .insert("x-session-id", "alice".parse().unwrap());
    app.clone().oneshot(request).await.unwrap();
    app.clone()
        .oneshot(converse_request("/converse?session_id=bob", b"second"))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::post("/reset")
                .header("x-session-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "status": "conversation reset" })
    );
    assert_eq!(state.sessions.get("alice").unwrap().message_count(), 0);
    assert_eq!(state.sessions.get("bob").unwrap().message_count(), 2);
}

#[tokio::test]
async fn reset_of_unknown_session_still_acknowledges() {
    let (state, app) = app(false);
    let response = app
        .oneshot(Request::post("/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.sessions.count(), 0);
}

#[tokio::test]
async fn session_endpoints() {
    let (_, app) = app(false);
    app.clone()
        .oneshot(converse_request("/converse?session_id=s1", b"hi"))
        .await
        .unwrap();

    let list = app
        .clone()
        .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(list).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["session_id"], "s1");

    let info = app
        .clone()
        .oneshot(Request::get("/api/sessions/s1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(info).await;
    assert_eq!(body["message_count"], 2);
    assert_eq!(body["state"], "idle");

    let deleted = app
        .clone()
        .oneshot(Request::delete("/api/sessions/s1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .oneshot(Request::get("/api/sessions/s1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn readiness_reports_sessions() {
    let (_, app) = app(false);
    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn metrics_disabled_without_recorder() {
    let (_, app) = app(false);
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auth_guards_exchange_endpoints() {
    let mut settings = Settings::default();
    settings.server.auth.enabled = true;
    settings.server.auth.api_key = Some("secret".to_string());
    let app = create_router(state_with(settings, false));

    let health = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let anonymous = app
        .clone()
        .oneshot(converse_request("/converse", b"hello"))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let mut authorized = converse_request("/converse", b"hello");
    authorized
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
    let response = app.oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn slow_exchange_outlasting_request_timeout_completes() {
    let (state, app) = slow_synthesis_app(false);
    let response = app
        .oneshot(converse_request("/converse", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["text"], "R");
    assert_eq!(body["audio"], "QVVESU8=");
    assert!(body["tts_time"].as_f64().unwrap() >= 1.5);
    assert!(body["total_time"].as_f64().unwrap() >= 1.5);
    assert_eq!(state.sessions.get("default").unwrap().message_count(), 2);
}

#[tokio::test]
async fn slow_stage_failure_is_500_not_timeout() {
    let (state, app) = slow_synthesis_app(true);
    let response = app
        .oneshot(converse_request("/converse", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "detail": "TTS error: Server error 503: voice busy" })
    );
    // Default commit policy keeps the pair written before synthesis
    assert_eq!(state.sessions.get("default").unwrap().message_count(), 2);
}
