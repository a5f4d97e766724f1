//! In-memory session store.

use crate::traits::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use vitae_core::{
    HealthCheck, HealthStatus, SessionRecord, SessionToken, UserId, VitaeError, VitaeResult,
};

/// Session store backed by a `HashMap`.
///
/// Used by test suites and single-node development setups. `fail_next`
/// makes the next store call return a database error.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionToken, SessionRecord>>,
    fail_next: AtomicBool,
    mutations: AtomicU64,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records.
    #[must_use]
    pub fn with_sessions(records: impl IntoIterator<Item = SessionRecord>) -> Self {
        let store = Self::new();
        {
            let mut sessions = store.sessions.lock();
            for record in records {
                sessions.insert(record.token.clone(), record);
            }
        }
        store
    }

    /// Makes the next store call fail with a database error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Returns true if a session with this token exists.
    #[must_use]
    pub fn contains(&self, token: &SessionToken) -> bool {
        self.sessions.lock().contains_key(token)
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Returns true if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Number of calls that removed or inserted at least one session.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn check_fault(&self) -> VitaeResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(VitaeError::Database("injected store failure".to_string()));
        }
        Ok(())
    }

    fn record_mutation(&self, changed: u64) {
        if changed > 0 {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find(&self, token: &SessionToken) -> VitaeResult<Option<SessionRecord>> {
        self.check_fault()?;
        Ok(self.sessions.lock().get(token).cloned())
    }

    async fn delete(&self, token: &SessionToken) -> VitaeResult<()> {
        self.check_fault()?;
        let removed = self.sessions.lock().remove(token);
        match removed {
            Some(_) => {
                self.record_mutation(1);
                Ok(())
            }
            None => Err(VitaeError::not_found("Session", token)),
        }
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64> {
        self.check_fault()?;
        let removed = {
            let mut sessions = self.sessions.lock();
            let initial = sessions.len();
            sessions.retain(|_, record| record.expires_at >= before);
            (initial - sessions.len()) as u64
        };
        self.record_mutation(removed);
        Ok(removed)
    }

    async fn delete_expired_for_user(
        &self,
        user_id: &UserId,
        before: DateTime<Utc>,
    ) -> VitaeResult<u64> {
        self.check_fault()?;
        let removed = {
            let mut sessions = self.sessions.lock();
            let initial = sessions.len();
            sessions.retain(|_, record| !(record.user_id == *user_id && record.expires_at < before));
            (initial - sessions.len()) as u64
        };
        self.record_mutation(removed);
        Ok(removed)
    }

    async fn create(&self, record: &SessionRecord) -> VitaeResult<()> {
        self.check_fault()?;
        {
            let mut sessions = self.sessions.lock();
            if sessions.contains_key(&record.token) {
                return Err(VitaeError::validation("session token already exists"));
            }
            sessions.insert(record.token.clone(), record.clone());
        }
        self.record_mutation(1);
        Ok(())
    }

    async fn count_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64> {
        self.check_fault()?;
        let count = self
            .sessions
            .lock()
            .values()
            .filter(|record| record.expires_at < before)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl HealthCheck for InMemorySessionStore {
    fn name(&self) -> &str {
        "session_store"
    }

    async fn check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
