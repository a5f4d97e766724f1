//! Session DTOs.

use crate::session::SessionResolution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitae_core::SessionUser;

/// Public view of a session user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUserDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl From<&SessionUser> for SessionUserDto {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Session status returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user: Option<SessionUserDto>,
}

impl SessionStatusResponse {
    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    /// Status for an optional session user.
    #[must_use]
    pub fn for_user(user: Option<&SessionUser>) -> Self {
        match user {
            Some(user) => Self {
                authenticated: true,
                user: Some(user.into()),
            },
            None => Self::unauthenticated(),
        }
    }
}

impl From<&SessionResolution> for SessionStatusResponse {
    fn from(resolution: &SessionResolution) -> Self {
        Self::for_user(resolution.user())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Result of an administrative cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub cleaned_tokens: u64,
    pub timestamp: DateTime<Utc>,
}

impl CleanupResponse {
    #[must_use]
    pub fn completed(cleaned_tokens: u64) -> Self {
        Self {
            success: true,
            cleaned_tokens,
            timestamp: Utc::now(),
        }
    }
}
