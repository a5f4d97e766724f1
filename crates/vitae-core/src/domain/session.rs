//! Session record entity.

use crate::{SessionToken, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal user display fields embedded in a session.
///
/// This is a snapshot taken when the session is read from the store and may
/// lag behind the user table until the cache entry is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User identifier.
    pub id: UserId,
    /// Display name, if the user has set one.
    pub name: Option<String>,
    /// Email address.
    pub email: String,
}

/// The authenticated identity bound to a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque token, unique per session.
    pub token: SessionToken,

    /// Owning user. A user may hold several sessions at once.
    pub user_id: UserId,

    /// Instant after which the token no longer authenticates. Never mutated.
    pub expires_at: DateTime<Utc>,

    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Denormalized user snapshot.
    pub user: SessionUser,
}

impl SessionRecord {
    /// Creates a new session record created now.
    #[must_use]
    pub fn new(token: SessionToken, user: SessionUser, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id: user.id.clone(),
            expires_at,
            created_at: Utc::now(),
            user,
        }
    }

    /// Checks whether the session is expired relative to `now`.
    ///
    /// Expired means `expires_at` is strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
