//! Session extractors.

use crate::{middleware::CurrentSession, responses::ApiResponse};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use vitae_core::{ErrorResponse, SessionRecord, SessionUser, VitaeError};

/// Extractor for an authenticated session.
///
/// Reads the [`CurrentSession`] placed by the session middleware and
/// rejects with 401 when there is none.
pub struct AuthenticatedUser(pub SessionRecord);

impl AuthenticatedUser {
    pub fn user(&self) -> &SessionUser {
        &self.0.user
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = SessionRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Error type for authentication extraction.
pub struct AuthError(VitaeError);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::UNAUTHORIZED);

        let error_response = ErrorResponse::from_error(&self.0);
        let body = Json(ApiResponse::<()>::error(error_response));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .and_then(|current| current.session.clone())
            .map(AuthenticatedUser)
            .ok_or_else(|| AuthError(VitaeError::unauthorized("No valid session")))
    }
}

/// Optional session extractor.
///
/// Returns `None` if the request carries no valid session, instead of failing.
pub struct OptionalUser(pub Option<SessionRecord>);

impl std::ops::Deref for OptionalUser {
    type Target = Option<SessionRecord>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<CurrentSession>()
            .and_then(|current| current.session.clone());
        Ok(OptionalUser(session))
    }
}
