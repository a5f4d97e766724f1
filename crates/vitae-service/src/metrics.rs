//! Session metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the session layer.
pub mod names {
    /// Session lookups served from the cache.
    pub const CACHE_HITS_TOTAL: &str = "vitae_session_cache_hits_total";
    /// Session lookups that missed the cache.
    pub const CACHE_MISSES_TOTAL: &str = "vitae_session_cache_misses_total";
    /// Cache entries evicted because the session expired.
    pub const CACHE_EXPIRED_TOTAL: &str = "vitae_session_cache_expired_total";
    /// Current number of cached sessions.
    pub const CACHE_ENTRIES: &str = "vitae_session_cache_entries";

    /// Expired tokens deleted from the store.
    pub const TOKENS_CLEANED_TOTAL: &str = "vitae_session_tokens_cleaned_total";
    /// Cleanup runs that failed against the store.
    pub const CLEANUP_FAILURES_TOTAL: &str = "vitae_session_cleanup_failures_total";
    /// Scheduled sweeps completed.
    pub const SWEEPS_TOTAL: &str = "vitae_session_sweeps_total";

    /// Resolutions by outcome.
    pub const RESOLUTIONS_TOTAL: &str = "vitae_session_resolutions_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Session lookups served from the cache");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Session lookups that missed the cache");
    describe_counter!(
        names::CACHE_EXPIRED_TOTAL,
        "Cache entries evicted because the session expired"
    );
    describe_gauge!(names::CACHE_ENTRIES, "Current number of cached sessions");
    describe_counter!(
        names::TOKENS_CLEANED_TOTAL,
        "Expired session tokens deleted from the store"
    );
    describe_counter!(
        names::CLEANUP_FAILURES_TOTAL,
        "Token cleanup runs that failed against the store"
    );
    describe_counter!(names::SWEEPS_TOTAL, "Scheduled session sweeps completed");
    describe_counter!(names::RESOLUTIONS_TOTAL, "Session resolutions by outcome");
}

/// Session metrics recorder.
#[derive(Clone)]
pub struct SessionMetrics;

impl SessionMetrics {
    /// Record a cache hit.
    pub fn cache_hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    /// Record a cache miss.
    pub fn cache_miss() {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Record expired entries evicted from the cache.
    pub fn cache_expired(count: usize) {
        if count > 0 {
            counter!(names::CACHE_EXPIRED_TOTAL).increment(count as u64);
        }
    }

    /// Update the cache size gauge.
    pub fn cache_size(size: usize) {
        gauge!(names::CACHE_ENTRIES).set(size as f64);
    }

    /// Record tokens deleted from the store.
    pub fn tokens_cleaned(trigger: &'static str, count: u64) {
        counter!(names::TOKENS_CLEANED_TOTAL, "trigger" => trigger).increment(count);
    }

    /// Record a failed cleanup.
    pub fn cleanup_failed(operation: &'static str) {
        counter!(names::CLEANUP_FAILURES_TOTAL, "operation" => operation).increment(1);
    }

    /// Record a completed scheduled sweep.
    pub fn sweep_completed() {
        counter!(names::SWEEPS_TOTAL).increment(1);
    }

    /// Record a resolution outcome.
    pub fn resolution(state: &'static str) {
        counter!(names::RESOLUTIONS_TOTAL, "state" => state).increment(1);
    }
}
