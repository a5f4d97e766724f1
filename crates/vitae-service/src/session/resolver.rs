//! Per-request session resolution.

use super::{CacheLookup, ExpiryPolicy, SessionCache, TokenCleanupService};
use crate::metrics::SessionMetrics;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use vitae_core::{SessionRecord, SessionToken, SessionUser, UserId, VitaeResult};
use vitae_repository::SessionStore;

/// Path a resolution took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// No token was presented.
    NoToken,
    /// Served from the cache.
    CacheHitValid,
    /// Cached session had expired and was removed.
    CacheHitExpired,
    /// Loaded from the store and cached.
    StoreHitValid,
    /// Store session had expired and was deleted.
    StoreHitExpired,
    /// Token unknown to both cache and store.
    StoreMiss,
}

impl ResolutionState {
    /// Returns true for the two authenticated outcomes.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::CacheHitValid | Self::StoreHitValid)
    }

    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::CacheHitValid => "cache_hit_valid",
            Self::CacheHitExpired => "cache_hit_expired",
            Self::StoreHitValid => "store_hit_valid",
            Self::StoreHitExpired => "store_hit_expired",
            Self::StoreMiss => "store_miss",
        }
    }
}

/// Outcome of resolving a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResolution {
    /// Path taken.
    pub state: ResolutionState,
    /// The session, present only when authenticated.
    pub session: Option<SessionRecord>,
}

impl SessionResolution {
    fn unauthenticated(state: ResolutionState) -> Self {
        Self { state, session: None }
    }

    fn authenticated(state: ResolutionState, session: SessionRecord) -> Self {
        Self {
            state,
            session: Some(session),
        }
    }

    /// Returns true if a valid session was found.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().map(|session| &session.user)
    }
}

/// Outcome of a logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// A token was presented.
    pub had_token: bool,
    /// The store held the token and it was deleted.
    pub store_deleted: bool,
}

/// Resolves session tokens, cache first and store second.
pub struct SessionResolver {
    cache: Arc<SessionCache>,
    store: Arc<dyn SessionStore>,
    cleanup: TokenCleanupService,
    policy: ExpiryPolicy,
    opportunistic_cleanup: bool,
}

impl SessionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        cache: Arc<SessionCache>,
        store: Arc<dyn SessionStore>,
        cleanup: TokenCleanupService,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            cache,
            store,
            cleanup,
            policy,
            opportunistic_cleanup: true,
        }
    }

    /// Enables or disables the background store cleanup fired by `resolve`.
    #[must_use]
    pub fn with_opportunistic_cleanup(mut self, enabled: bool) -> Self {
        self.opportunistic_cleanup = enabled;
        self
    }

    /// The cleanup service used by this resolver.
    #[must_use]
    pub fn cleanup(&self) -> &TokenCleanupService {
        &self.cleanup
    }

    /// Resolves a token to a session.
    ///
    /// Unknown, expired and missing tokens are unauthenticated results, not
    /// errors. Only a failed store lookup or a failed authoritative delete
    /// is returned as `Err`.
    pub async fn resolve(&self, token: Option<&SessionToken>) -> VitaeResult<SessionResolution> {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Ok(self.finish(token, SessionResolution::unauthenticated(ResolutionState::NoToken)));
        };

        if self.opportunistic_cleanup {
            self.cleanup.spawn_cleanup_expired();
        }

        let now = Utc::now();

        match self.cache.lookup(token, now) {
            CacheLookup::Hit(session) => {
                return Ok(self.finish(
                    Some(token),
                    SessionResolution::authenticated(ResolutionState::CacheHitValid, session),
                ));
            }
            CacheLookup::Expired => {
                self.cleanup.cleanup_specific_token(token).await;
                return Ok(self.finish(
                    Some(token),
                    SessionResolution::unauthenticated(ResolutionState::CacheHitExpired),
                ));
            }
            CacheLookup::Miss => {}
        }

        let resolution = match self.store.find(token).await? {
            None => SessionResolution::unauthenticated(ResolutionState::StoreMiss),
            Some(session) if self.policy.is_expired_at(session.expires_at, now) => {
                match self.store.delete(token).await {
                    Ok(()) => {}
                    // Removed concurrently, e.g. by a background cleanup.
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
                SessionResolution::unauthenticated(ResolutionState::StoreHitExpired)
            }
            Some(session) => {
                self.cache.set(token.clone(), session.clone());
                SessionResolution::authenticated(ResolutionState::StoreHitValid, session)
            }
        };

        Ok(self.finish(Some(token), resolution))
    }

    /// Removes a session from cache and store.
    ///
    /// Runs regardless of whether the session was still valid.
    pub async fn logout(&self, token: Option<&SessionToken>) -> LogoutOutcome {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return LogoutOutcome {
                had_token: false,
                store_deleted: false,
            };
        };

        self.cache.delete(token);
        let store_deleted = self.cleanup.cleanup_specific_token(token).await;
        debug!(token = %token, store_deleted, "Session logged out");

        LogoutOutcome {
            had_token: true,
            store_deleted,
        }
    }

    /// Drops a user's cached sessions so the next request reloads the
    /// user snapshot from the store.
    pub fn invalidate_user(&self, user_id: &UserId) -> usize {
        self.cache.evict_user(user_id)
    }

    fn finish(&self, token: Option<&SessionToken>, resolution: SessionResolution) -> SessionResolution {
        SessionMetrics::resolution(resolution.state.as_str());
        if let Some(token) = token {
            debug!(token = %token, state = resolution.state.as_str(), "Session resolved");
        }
        resolution
    }
}
