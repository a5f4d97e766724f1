//! Session controller.

use crate::{
    extractors::{AuthenticatedUser, OptionalUser},
    middleware::CurrentSession,
    responses::{ok, ApiResult},
    state::AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use vitae_service::{LogoutResponse, SessionStatusResponse, SessionUserDto};

/// Creates the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(session_status))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// Reports whether the request carries a valid session.
///
/// Never fails: lookup errors were already folded into "unauthenticated".
async fn session_status(OptionalUser(session): OptionalUser) -> Json<SessionStatusResponse> {
    Json(SessionStatusResponse::for_user(
        session.as_ref().map(|session| &session.user),
    ))
}

/// Deletes the session and clears the cookie.
///
/// Also clears the cookie when the token was unknown or already expired.
async fn logout(
    State(state): State<AppState>,
    current: Option<Extension<CurrentSession>>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let token = current
        .and_then(|Extension(current)| current.token)
        .or_else(|| state.cookies.token(&jar));

    let outcome = state.resolver.logout(token.as_ref()).await;
    debug!(had_token = outcome.had_token, store_deleted = outcome.store_deleted, "Logout");

    (
        jar.add(state.cookies.removal()),
        Json(LogoutResponse { success: true }),
    )
}

/// Get current authenticated user.
async fn get_current_user(user: AuthenticatedUser) -> ApiResult<SessionUserDto> {
    debug!(user_id = %user.user_id, "Get current user");
    ok(SessionUserDto::from(user.user()))
}
