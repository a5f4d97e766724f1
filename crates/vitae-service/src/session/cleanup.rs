//! Expired token cleanup.

use super::SessionCache;
use crate::metrics::SessionMetrics;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vitae_core::{SessionToken, UserId};
use vitae_repository::SessionStore;

/// Deletes expired session tokens from the store and the cache.
///
/// Every operation is best-effort: store failures are logged and reported
/// as a zero count or `false`, never as an error.
#[derive(Clone)]
pub struct TokenCleanupService {
    store: Arc<dyn SessionStore>,
    cache: Arc<SessionCache>,
    in_flight: Arc<AtomicBool>,
    pending: Arc<Mutex<Option<JoinHandle<u64>>>>,
}

impl TokenCleanupService {
    /// Creates a cleanup service over a store and cache.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, cache: Arc<SessionCache>) -> Self {
        Self {
            store,
            cache,
            in_flight: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Deletes every expired token. Returns the number removed from the store.
    pub async fn cleanup_expired_tokens(&self) -> u64 {
        self.cleanup_expired("background").await
    }

    /// Deletes one user's expired tokens.
    pub async fn cleanup_user_expired_tokens(&self, user_id: &UserId) -> u64 {
        match self.store.delete_expired_for_user(user_id, Utc::now()).await {
            Ok(count) => {
                if count > 0 {
                    info!(user_id = %user_id, cleaned = count, "Cleaned up expired tokens for user");
                }
                SessionMetrics::tokens_cleaned("user", count);
                count
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to clean up user tokens");
                SessionMetrics::cleanup_failed("user");
                0
            }
        }
    }

    /// Deletes one token from the cache and the store.
    ///
    /// Returns false if the store delete failed, including when the token
    /// was already gone.
    pub async fn cleanup_specific_token(&self, token: &SessionToken) -> bool {
        self.cache.delete(token);

        match self.store.delete(token).await {
            Ok(()) => {
                debug!(token = %token, "Deleted session token");
                SessionMetrics::tokens_cleaned("single", 1);
                true
            }
            Err(e) if e.is_not_found() => {
                debug!(token = %token, "Session token already deleted");
                false
            }
            Err(e) => {
                error!(token = %token, error = %e, "Failed to delete session token");
                SessionMetrics::cleanup_failed("single");
                false
            }
        }
    }

    /// Runs one sweep now, for manual or administrative use.
    pub async fn immediate_cleanup(&self) -> u64 {
        info!("Manual token cleanup triggered");
        self.cleanup_expired("manual").await
    }

    /// Runs one scheduled sweep tick.
    pub(crate) async fn scheduled_cleanup(&self) -> u64 {
        self.cleanup_expired("scheduled").await
    }

    /// Starts `cleanup_expired_tokens` on a detached task.
    ///
    /// At most one such task runs at a time; calls made while one is in
    /// flight are skipped. Returns true if a task was started.
    pub fn spawn_cleanup_expired(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping background token cleanup");
            return false;
        };

        // Claiming the flag and publishing the handle happen under one lock,
        // so a newer handle is never overwritten by an older one.
        let mut pending = self.pending.lock();
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Background token cleanup already running");
            return false;
        }

        let this = self.clone();
        *pending = Some(runtime.spawn(async move {
            let _guard = InFlightGuard(Arc::clone(&this.in_flight));
            this.cleanup_expired("background").await
        }));
        true
    }

    /// Waits until no background cleanup is pending.
    pub async fn drain(&self) {
        loop {
            let handle = self.pending.lock().take();
            let Some(handle) = handle else {
                break;
            };
            if let Err(e) = handle.await {
                warn!(error = %e, "Background token cleanup task failed");
            }
        }
    }

    async fn cleanup_expired(&self, trigger: &'static str) -> u64 {
        let now = Utc::now();
        self.cache.sweep(now);

        match self.store.delete_expired(now).await {
            Ok(count) => {
                if count > 0 {
                    info!(cleaned = count, trigger, "Cleaned up expired session tokens");
                } else {
                    debug!(trigger, "No expired session tokens to clean up");
                }
                SessionMetrics::tokens_cleaned(trigger, count);
                count
            }
            Err(e) => {
                error!(error = %e, trigger, "Failed to clean up expired session tokens");
                SessionMetrics::cleanup_failed(trigger);
                0
            }
        }
    }
}

/// Clears the in-flight flag when the background task ends, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use mockall::mock;
    use std::sync::atomic::AtomicUsize;
    use vitae_core::{SessionRecord, SessionUser, VitaeError, VitaeResult};
    use vitae_repository::InMemorySessionStore;

    mock! {
        pub Store {}

        #[async_trait]
        impl SessionStore for Store {
            async fn find(&self, token: &SessionToken) -> VitaeResult<Option<SessionRecord>>;
            async fn delete(&self, token: &SessionToken) -> VitaeResult<()>;
            async fn delete_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64>;
            async fn delete_expired_for_user(
                &self,
                user_id: &UserId,
                before: DateTime<Utc>,
            ) -> VitaeResult<u64>;
            async fn create(&self, record: &SessionRecord) -> VitaeResult<()>;
            async fn count_expired(&self, before: DateTime<Utc>) -> VitaeResult<u64>;
        }
    }

    fn record(token: &str, user: &str, expires_in_minutes: i64) -> SessionRecord {
        SessionRecord::new(
            SessionToken::new(token),
            SessionUser {
                id: UserId::new(user),
                name: None,
                email: format!("{user}@example.com"),
            },
            Utc::now() + Duration::minutes(expires_in_minutes),
        )
    }

    fn service(store: Arc<dyn SessionStore>) -> (TokenCleanupService, Arc<SessionCache>) {
        let cache = Arc::new(SessionCache::default());
        (TokenCleanupService::new(store, Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn test_cleanup_expired_is_idempotent() {
        let store = Arc::new(InMemorySessionStore::with_sessions([
            record("a", "u1", -10),
            record("b", "u2", -1),
            record("c", "u1", 30),
        ]));
        let (cleanup, _) = service(store.clone());

        assert_eq!(cleanup.cleanup_expired_tokens().await, 2);
        assert_eq!(cleanup.cleanup_expired_tokens().await, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps_cache() {
        let store = Arc::new(InMemorySessionStore::new());
        let (cleanup, cache) = service(store);
        let expired = record("old", "u1", -1);
        cache.set(expired.token.clone(), expired);

        cleanup.cleanup_expired_tokens().await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_absorbed() {
        let mut mock = MockStore::new();
        mock.expect_delete_expired()
            .times(1)
            .returning(|_| Err(VitaeError::Database("connection refused".to_string())));
        let (cleanup, _) = service(Arc::new(mock));

        assert_eq!(cleanup.cleanup_expired_tokens().await, 0);
    }

    #[tokio::test]
    async fn test_user_cleanup_failure_is_absorbed() {
        let mut mock = MockStore::new();
        mock.expect_delete_expired_for_user()
            .times(1)
            .returning(|_, _| Err(VitaeError::Database("deadlock".to_string())));
        let (cleanup, _) = service(Arc::new(mock));

        assert_eq!(cleanup.cleanup_user_expired_tokens(&UserId::new("u1")).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_user_tokens_scoped() {
        let store = Arc::new(InMemorySessionStore::with_sessions([
            record("a", "u1", -10),
            record("b", "u2", -10),
        ]));
        let (cleanup, _) = service(store.clone());

        assert_eq!(cleanup.cleanup_user_expired_tokens(&UserId::new("u1")).await, 1);
        assert!(store.contains(&SessionToken::new("b")));
    }

    #[tokio::test]
    async fn test_cleanup_specific_token() {
        let store = Arc::new(InMemorySessionStore::with_sessions([record("abc", "u1", 30)]));
        let (cleanup, cache) = service(store.clone());
        let token = SessionToken::new("abc");
        cache.set(token.clone(), record("abc", "u1", 30));

        assert!(cleanup.cleanup_specific_token(&token).await);
        assert!(!store.contains(&token));
        assert!(cache.is_empty());

        // Second delete hits NotFound and reports false.
        assert!(!cleanup.cleanup_specific_token(&token).await);
    }

    #[tokio::test]
    async fn test_cleanup_specific_token_store_error() {
        let mut mock = MockStore::new();
        mock.expect_delete()
            .returning(|_| Err(VitaeError::Database("timeout".to_string())));
        let (cleanup, _) = service(Arc::new(mock));

        assert!(!cleanup.cleanup_specific_token(&SessionToken::new("abc")).await);
    }

    #[tokio::test]
    async fn test_immediate_cleanup_with_nothing_expired() {
        let store = Arc::new(InMemorySessionStore::with_sessions([record("a", "u1", 30)]));
        let (cleanup, _) = service(store.clone());

        assert_eq!(cleanup.immediate_cleanup().await, 0);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_cleanup_runs_detached() {
        let store = Arc::new(InMemorySessionStore::with_sessions([record("a", "u1", -5)]));
        let (cleanup, _) = service(store.clone());

        assert!(cleanup.spawn_cleanup_expired());
        cleanup.drain().await;

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_cleanup_coalesces() {
        let store = Arc::new(InMemorySessionStore::new());
        let (cleanup, _) = service(store);

        // The first task cannot run until this test yields.
        assert!(cleanup.spawn_cleanup_expired());
        assert!(!cleanup.spawn_cleanup_expired());

        cleanup.drain().await;
        assert!(cleanup.spawn_cleanup_expired());
        cleanup.drain().await;
    }

    #[tokio::test]
    async fn test_spawn_cleanup_failure_does_not_propagate() {
        let store = Arc::new(InMemorySessionStore::new());
        store.fail_next();
        let (cleanup, _) = service(store);

        assert!(cleanup.spawn_cleanup_expired());
        cleanup.drain().await;
        assert!(cleanup.spawn_cleanup_expired());
        cleanup.drain().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_drain_waits_for_every_started_cleanup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mock = MockStore::new();
        let counter = Arc::clone(&calls);
        mock.expect_delete_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        });
        let (cleanup, _) = service(Arc::new(mock));

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let cleanup = cleanup.clone();
                tokio::spawn(async move {
                    let mut started = 0;
                    for _ in 0..50 {
                        if cleanup.spawn_cleanup_expired() {
                            started += 1;
                        }
                        tokio::task::yield_now().await;
                    }
                    started
                })
            })
            .collect();

        let mut started = 0;
        for caller in callers {
            started += caller.await.unwrap();
        }
        cleanup.drain().await;

        assert!(started > 0);
        assert_eq!(calls.load(Ordering::SeqCst), started);
        assert!(!cleanup.in_flight.load(Ordering::SeqCst));
        assert!(cleanup.pending.lock().is_none());
    }

    #[test]
    fn test_spawn_without_runtime_is_skipped() {
        let (cleanup, _) = service(Arc::new(InMemorySessionStore::new()));
        assert!(!cleanup.spawn_cleanup_expired());
    }
}
