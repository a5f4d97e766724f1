//! In-process session cache.

use super::ExpiryPolicy;
use crate::metrics::SessionMetrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use vitae_core::{SessionRecord, SessionToken, UserId};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry present and the session is still valid.
    Hit(SessionRecord),
    /// Entry was present but the session had expired. It has been evicted.
    Expired,
    /// No usable entry. Stale entries past their cache TTL count as misses.
    Miss,
}

struct CacheEntry {
    record: SessionRecord,
    evict_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, now: Instant) -> bool {
        now >= self.evict_at
    }
}

/// Token → session map shared by all requests.
///
/// Every entry has a cache TTL that is independent of the session's own
/// `expires_at`. Reads check both deadlines; the periodic sweep removes
/// entries nobody reads. A record whose `expires_at` has passed is never
/// returned, whatever its cache TTL says.
pub struct SessionCache {
    entries: RwLock<HashMap<SessionToken, CacheEntry>>,
    ttl: Duration,
    policy: ExpiryPolicy,
}

impl SessionCache {
    /// Default cache TTL.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
    /// Largest TTL a cache will apply. Longer values are clamped.
    pub const MAX_TTL: Duration = Duration::from_secs(31_536_000);

    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, policy: ExpiryPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: ttl.min(Self::MAX_TTL),
            policy,
        }
    }

    /// Cache TTL applied by `set`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a token, evicting the entry if it is stale or expired.
    pub fn lookup(&self, token: &SessionToken, now: DateTime<Utc>) -> CacheLookup {
        let clock = Instant::now();

        let outcome = {
            let entries = self.entries.read();
            match entries.get(token) {
                None => None,
                Some(entry) if entry.is_stale(clock) => Some(CacheLookup::Miss),
                Some(entry) if self.policy.is_expired_at(entry.record.expires_at, now) => {
                    Some(CacheLookup::Expired)
                }
                Some(entry) => Some(CacheLookup::Hit(entry.record.clone())),
            }
        };

        match outcome {
            None => {
                SessionMetrics::cache_miss();
                CacheLookup::Miss
            }
            Some(CacheLookup::Hit(record)) => {
                SessionMetrics::cache_hit();
                debug!(token = %token, "Session cache hit");
                CacheLookup::Hit(record)
            }
            Some(CacheLookup::Expired) => {
                // Another request may have replaced the entry in between.
                let removed = self.remove_if(token, |entry| {
                    self.policy.is_expired_at(entry.record.expires_at, now)
                });
                SessionMetrics::cache_expired(usize::from(removed));
                debug!(token = %token, "Evicted expired session from cache");
                CacheLookup::Expired
            }
            Some(CacheLookup::Miss) => {
                self.remove_if(token, |entry| entry.is_stale(clock));
                SessionMetrics::cache_miss();
                debug!(token = %token, "Evicted stale session from cache");
                CacheLookup::Miss
            }
        }
    }

    /// Returns the cached session if present, valid and within its TTL.
    pub fn get(&self, token: &SessionToken) -> Option<SessionRecord> {
        match self.lookup(token, Utc::now()) {
            CacheLookup::Hit(record) => Some(record),
            CacheLookup::Expired | CacheLookup::Miss => None,
        }
    }

    /// Inserts or replaces an entry and restarts its TTL.
    pub fn set(&self, token: SessionToken, record: SessionRecord) {
        let entry = CacheEntry {
            record,
            evict_at: Instant::now() + self.ttl,
        };
        let size = {
            let mut entries = self.entries.write();
            entries.insert(token, entry);
            entries.len()
        };
        SessionMetrics::cache_size(size);
    }

    /// Removes an entry. Returns true if one was present.
    pub fn delete(&self, token: &SessionToken) -> bool {
        let (removed, size) = {
            let mut entries = self.entries.write();
            let removed = entries.remove(token).is_some();
            (removed, entries.len())
        };
        SessionMetrics::cache_size(size);
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
        SessionMetrics::cache_size(0);
    }

    /// Removes entries whose session expired before `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = self.retain(|entry| !self.policy.is_expired_at(entry.record.expires_at, now));
        SessionMetrics::cache_expired(removed);
        if removed > 0 {
            debug!(removed, "Swept expired sessions from cache");
        }
        removed
    }

    /// Removes entries whose cache TTL has elapsed.
    pub fn evict_stale(&self) -> usize {
        let clock = Instant::now();
        let removed = self.retain(|entry| !entry.is_stale(clock));
        if removed > 0 {
            debug!(removed, "Evicted stale sessions from cache");
        }
        removed
    }

    /// Removes every entry belonging to a user, e.g. after a profile change.
    pub fn evict_user(&self, user_id: &UserId) -> usize {
        self.retain(|entry| entry.record.user_id != *user_id)
    }

    /// Number of entries, including ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn retain(&self, keep: impl Fn(&CacheEntry) -> bool) -> usize {
        let (removed, size) = {
            let mut entries = self.entries.write();
            let initial = entries.len();
            entries.retain(|_, entry| keep(entry));
            (initial - entries.len(), entries.len())
        };
        SessionMetrics::cache_size(size);
        removed
    }

    fn remove_if(&self, token: &SessionToken, predicate: impl Fn(&CacheEntry) -> bool) -> bool {
        let (removed, size) = {
            let mut entries = self.entries.write();
            let removed = match entries.get(token) {
                Some(entry) if predicate(entry) => entries.remove(token).is_some(),
                _ => false,
            };
            (removed, entries.len())
        };
        SessionMetrics::cache_size(size);
        removed
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL, ExpiryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use vitae_core::SessionUser;

    fn record(token: &str, user: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord::new(
            SessionToken::new(token),
            SessionUser {
                id: UserId::new(user),
                name: Some("Test".to_string()),
                email: format!("{user}@example.com"),
            },
            expires_at,
        )
    }

    fn valid(token: &str) -> SessionRecord {
        record(token, "u1", Utc::now() + ChronoDuration::minutes(30))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = SessionCache::default();
        let r = valid("abc");
        cache.set(r.token.clone(), r.clone());

        assert_eq!(cache.get(&r.token), Some(r));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_miss() {
        let cache = SessionCache::default();
        assert!(cache.get(&SessionToken::new("nope")).is_none());
        assert_eq!(
            cache.lookup(&SessionToken::new("nope"), Utc::now()),
            CacheLookup::Miss
        );
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped() {
        let cache = SessionCache::new(Duration::from_secs(u64::MAX), ExpiryPolicy::default());
        assert_eq!(cache.ttl(), SessionCache::MAX_TTL);

        let r = valid("abc");
        cache.set(r.token.clone(), r.clone());
        assert_eq!(cache.get(&r.token), Some(r));
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let cache = SessionCache::default();
        let first = valid("abc");
        let mut second = valid("abc");
        second.user.email = "changed@example.com".to_string();

        cache.set(first.token.clone(), first);
        cache.set(second.token.clone(), second.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&second.token).unwrap().user.email, "changed@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_evicted_after_ttl() {
        let cache = SessionCache::new(Duration::from_secs(300), ExpiryPolicy::default());
        let r = valid("abc");
        cache.set(r.token.clone(), r.clone());

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&r.token).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&r.token).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_ttl() {
        let cache = SessionCache::new(Duration::from_secs(10), ExpiryPolicy::default());
        let r = valid("abc");
        cache.set(r.token.clone(), r.clone());

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set(r.token.clone(), r.clone());
        tokio::time::advance(Duration::from_secs(8)).await;

        assert!(cache.get(&r.token).is_some());
    }

    #[tokio::test]
    async fn test_expired_record_never_returned_within_ttl() {
        let cache = SessionCache::default();
        let r = record("abc", "u1", Utc::now() - ChronoDuration::minutes(1));
        cache.set(r.token.clone(), r.clone());

        assert_eq!(cache.lookup(&r.token, Utc::now()), CacheLookup::Expired);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(&r.token, Utc::now()), CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_record_expiring_while_cached() {
        let cache = SessionCache::default();
        let expires_at = Utc::now() + ChronoDuration::minutes(1);
        let r = record("abc", "u1", expires_at);
        cache.set(r.token.clone(), r.clone());

        assert!(matches!(cache.lookup(&r.token, expires_at), CacheLookup::Hit(_)));
        assert_eq!(
            cache.lookup(&r.token, expires_at + ChronoDuration::seconds(1)),
            CacheLookup::Expired
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = SessionCache::default();
        let r = valid("abc");
        cache.set(r.token.clone(), r.clone());

        assert!(cache.delete(&r.token));
        assert!(!cache.delete(&r.token));
        assert!(cache.get(&r.token).is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SessionCache::default();
        for token in ["a", "b", "c"] {
            let r = valid(token);
            cache.set(r.token.clone(), r);
        }

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let cache = SessionCache::default();
        let now = Utc::now();
        let expired = record("old", "u1", now - ChronoDuration::minutes(5));
        let fresh = valid("fresh");
        cache.set(expired.token.clone(), expired);
        cache.set(fresh.token.clone(), fresh.clone());

        assert_eq!(cache.sweep(now), 1);
        assert_eq!(cache.sweep(now), 0);
        assert!(cache.get(&fresh.token).is_some());
    }

    #[tokio::test]
    async fn test_sweep_empty_cache_is_noop() {
        let cache = SessionCache::default();
        assert_eq!(cache.sweep(Utc::now()), 0);
        assert_eq!(cache.evict_stale(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_stale() {
        let cache = SessionCache::new(Duration::from_secs(60), ExpiryPolicy::default());
        let old = valid("old");
        cache.set(old.token.clone(), old);

        tokio::time::advance(Duration::from_secs(30)).await;
        let young = valid("young");
        cache.set(young.token.clone(), young.clone());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.evict_stale(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&young.token).is_some());
    }

    #[tokio::test]
    async fn test_evict_user() {
        let cache = SessionCache::default();
        let expires = Utc::now() + ChronoDuration::minutes(30);
        for (token, user) in [("a", "u1"), ("b", "u1"), ("c", "u2")] {
            let r = record(token, user, expires);
            cache.set(r.token.clone(), r);
        }

        assert_eq!(cache.evict_user(&UserId::new("u1")), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let cache = Arc::new(SessionCache::default());
        let mut handles = Vec::new();

        for i in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let r = valid(&format!("token-{}", i % 4));
                cache.set(r.token.clone(), r.clone());
                assert!(cache.get(&r.token).is_some());
                cache.sweep(Utc::now());
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 4);
    }
}
