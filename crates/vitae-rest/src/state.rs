//! Application state for Axum handlers.

use crate::cookies::SessionCookies;
use std::sync::Arc;
use vitae_config::AdminConfig;
use vitae_core::HealthCheck;
use vitae_service::{SessionResolver, TokenCleanupService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<SessionResolver>,
    pub cookies: Arc<SessionCookies>,
    pub admin: Arc<AdminConfig>,
    pub health_checks: Arc<Vec<Arc<dyn HealthCheck>>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(resolver: Arc<SessionResolver>, cookies: SessionCookies, admin: AdminConfig) -> Self {
        Self {
            resolver,
            cookies: Arc::new(cookies),
            admin: Arc::new(admin),
            health_checks: Arc::new(Vec::new()),
        }
    }

    /// Adds dependencies reported by the readiness endpoint.
    #[must_use]
    pub fn with_health_checks(mut self, checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        self.health_checks = Arc::new(checks);
        self
    }

    /// Cleanup service behind the admin endpoints.
    pub fn cleanup(&self) -> &TokenCleanupService {
        self.resolver.cleanup()
    }
}
