//! Administrative token cleanup.

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use vitae_service::CleanupResponse;

/// Creates the admin router.
pub fn router() -> Router<AppState> {
    // GET mutates exactly like POST. Kept for existing callers.
    Router::new().route("/cleanup-tokens", post(cleanup_tokens).get(cleanup_tokens))
}

#[derive(Debug, Serialize)]
struct AdminError {
    success: bool,
    error: &'static str,
}

/// Runs an immediate expired-token cleanup.
async fn cleanup_tokens(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !is_authorized(state.admin.api_key.as_deref(), &headers) {
        warn!("Rejected unauthorized token cleanup request");
        return (
            StatusCode::UNAUTHORIZED,
            Json(AdminError {
                success: false,
                error: "Unauthorized",
            }),
        )
            .into_response();
    }

    let cleaned = state.cleanup().immediate_cleanup().await;
    info!(cleaned, "Admin token cleanup completed");

    Json(CleanupResponse::completed(cleaned)).into_response()
}

/// Compares the bearer token with the configured key. No key means no check.
fn is_authorized(api_key: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = api_key.filter(|key| !key.is_empty()) else {
        return true;
    };

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|provided| keys_match(provided, expected))
}

/// Constant-time key comparison. Only the length difference is observable.
fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
