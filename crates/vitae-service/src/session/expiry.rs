//! Expiry policy.

use chrono::{DateTime, Duration, Utc};
use vitae_config::SessionConfig;

/// Converts configured lifetimes into instants and decides expiry.
///
/// Holds no mutable state. Callers capture `now` once per request and pass
/// it to every check so a single evaluation never compares against two
/// different clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    session_lifetime_minutes: i64,
    magic_link_lifetime_minutes: i64,
    sweep_interval: std::time::Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl ExpiryPolicy {
    /// Builds the policy from session configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            session_lifetime_minutes: config.session_token_lifetime_minutes,
            magic_link_lifetime_minutes: config.magic_link_token_lifetime_minutes,
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Returns true if `expires_at` has passed, using the current time.
    #[must_use]
    pub fn is_expired(&self, expires_at: DateTime<Utc>) -> bool {
        self.is_expired_at(expires_at, Utc::now())
    }

    /// Returns true if `expires_at` is strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at < now
    }

    /// Adds `minutes` to `now`.
    #[must_use]
    pub fn compute_expiry(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        now + Duration::minutes(minutes)
    }

    /// Expiry instant for a session created at `now`.
    #[must_use]
    pub fn session_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Self::compute_expiry(now, self.session_lifetime_minutes)
    }

    /// Expiry instant for a magic-link token issued at `now`.
    #[must_use]
    pub fn magic_link_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Self::compute_expiry(now, self.magic_link_lifetime_minutes)
    }

    /// Cadence of the scheduled sweep.
    #[must_use]
    pub const fn sweep_interval(&self) -> std::time::Duration {
        self.sweep_interval
    }
}
