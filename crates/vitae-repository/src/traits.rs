//! Session store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vitae_core::{SessionRecord, SessionToken, UserId, VitaeResult};

/// Persistent session store.
///
/// The store is the system of record: whenever the in-process cache and the
/// store disagree, the store wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Finds a session by token, including the owning user's snapshot.
    async fn find(&self, token: &SessionToken) -> VitaeResult<Option<SessionRecord>>;

    /// Deletes a session by token.
    ///
    /// Returns `VitaeError::NotFound` if no such session exists.
    async fn delete(&self, token: &SessionToken) -> VitaeResult<()>;

    /// Deletes every session whose `expires_at` is before `before`.
    async fn delete_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64>;

    /// Deletes the user's sessions whose `expires_at` is before `before`.
    async fn delete_expired_for_user(
        &self,
        user_id: &UserId,
        before: DateTime<Utc>,
    ) -> VitaeResult<u64>;

    /// Stores a new session. The user snapshot is upserted alongside.
    async fn create(&self, record: &SessionRecord) -> VitaeResult<()>;

    /// Counts sessions whose `expires_at` is before `before` without deleting them.
    async fn count_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64>;
}
