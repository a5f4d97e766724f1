//! Session resolution middleware.

use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;
use vitae_core::{SessionRecord, SessionToken, SessionUser};

/// Session of the current request, set by [`session_middleware`].
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    /// Token presented by the client, valid or not.
    pub token: Option<SessionToken>,
    /// The resolved session when authenticated.
    pub session: Option<SessionRecord>,
}

impl CurrentSession {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().map(|session| &session.user)
    }
}

/// Resolves the session cookie once per request.
///
/// A failed resolution is logged and the request continues unauthenticated;
/// the failure detail never reaches the client.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = state.cookies.token(&jar);

    let session = match state.resolver.resolve(token.as_ref()).await {
        Ok(resolution) => resolution.session,
        Err(e) => {
            error!(error = %e, "Session resolution failed, treating request as unauthenticated");
            None
        }
    };

    request
        .extensions_mut()
        .insert(CurrentSession { token, session });

    next.run(request).await
}
