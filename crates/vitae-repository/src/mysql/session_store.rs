//! MySQL session store implementation.

use crate::{traits::SessionStore, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;
use vitae_core::{SessionRecord, SessionToken, SessionUser, UserId, VitaeError, VitaeResult};

/// MySQL session store.
#[derive(Clone)]
pub struct MySqlSessionStore {
    pool: Arc<DatabasePool>,
}

impl MySqlSessionStore {
    /// Creates a new MySQL session store.
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

/// Session joined with its user.
#[derive(Debug, FromRow)]
struct SessionRow {
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: String,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        let user_id = UserId::new(row.user_id);
        Self {
            token: SessionToken::new(row.token),
            user_id: user_id.clone(),
            expires_at: row.expires_at,
            created_at: row.created_at,
            user: SessionUser {
                id: user_id,
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

#[async_trait]
impl SessionStore for MySqlSessionStore {
    async fn find(&self, token: &SessionToken) -> VitaeResult<Option<SessionRecord>> {
        debug!(token = %token, "Finding session");

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT s.token, s.user_id, s.expires_at, s.created_at,
                   u.name AS user_name, u.email AS user_email
            FROM sessions s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(SessionRecord::from))
    }

    async fn delete(&self, token: &SessionToken) -> VitaeResult<()> {
        debug!(token = %token, "Deleting session");

        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token.as_str())
            .execute(self.pool.inner())
            .await?;

        if result.rows_affected() == 0 {
            return Err(VitaeError::not_found("Session", token));
        }
        Ok(())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(before)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_for_user(
        &self,
        user_id: &UserId,
        before: DateTime<Utc>,
    ) -> VitaeResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND expires_at < ?")
            .bind(user_id.as_str())
            .bind(before)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected())
    }

    async fn create(&self, record: &SessionRecord) -> VitaeResult<()> {
        debug!(token = %record.token, user_id = %record.user_id, "Creating session");

        let mut tx = self.pool.inner().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE name = VALUES(name), email = VALUES(email)
            "#,
        )
        .bind(record.user.id.as_str())
        .bind(record.user.name.as_deref())
        .bind(&record.user.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.token.as_str())
        .bind(record.user_id.as_str())
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn count_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE expires_at < ?")
            .bind(before)
            .fetch_one(self.pool.inner())
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
