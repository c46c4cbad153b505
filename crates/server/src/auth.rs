//! Authentication Middleware
//!
//! Optional API key authentication via `Authorization: Bearer <key>`.
//! Paths listed in `server.auth.public_paths` always pass through.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use voice_turn_config::AuthConfig;

use crate::state::AppState;

/// Warn about disabled auth once per process
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

enum AuthCheck {
    Disabled,
    PublicPath,
    ConfigError(&'static str),
    CheckKey(String),
}

fn check_auth_config(auth: &AuthConfig, path: &str) -> AuthCheck {
    if !auth.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "API authentication is disabled. Set VOICE_TURN__SERVER__AUTH__ENABLED=true for production."
            );
        }
        return AuthCheck::Disabled;
    }

    if auth.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return AuthCheck::PublicPath;
    }

    match &auth.api_key {
        Some(key) if !key.is_empty() => AuthCheck::CheckKey(key.clone()),
        _ => AuthCheck::ConfigError("Auth is enabled but no API key is configured"),
    }
}

fn reject(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

/// Check the bearer token against the configured API key
///
/// Returns 401 for a missing or wrong key and 400 for a malformed header.
pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    match check_auth_config(&state.config.server.auth, &path) {
        AuthCheck::Disabled | AuthCheck::PublicPath => next.run(request).await,
        AuthCheck::ConfigError(msg) => {
            tracing::error!("{}", msg);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Server authentication not configured")
        }
        AuthCheck::CheckKey(expected_key) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            match auth_header {
                Some(header) => match header.strip_prefix("Bearer ") {
                    Some(provided) => {
                        if constant_time_compare(provided.as_bytes(), expected_key.as_bytes()) {
                            next.run(request).await
                        } else {
                            tracing::warn!(
                                path = %path,
                                forwarded_for = ?request.headers().get("X-Forwarded-For"),
                                "Invalid API key"
                            );
                            reject(StatusCode::UNAUTHORIZED, "Invalid API key")
                        }
                    }
                    None => reject(
                        StatusCode::BAD_REQUEST,
                        "Invalid Authorization header format. Expected: Bearer <token>",
                    ),
                },
                None => reject(StatusCode::UNAUTHORIZED, "Missing Authorization header"),
            }
        }
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
