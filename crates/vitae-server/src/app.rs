//! Application assembly and lifecycle.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use vitae_config::{AppConfig, SessionConfig};
use vitae_core::{HealthCheck, VitaeError, VitaeResult};
use vitae_repository::{create_pool, DatabasePool, MySqlSessionStore, SessionStore};
use vitae_rest::{cookies::SessionCookies, create_router, AppState};
use vitae_service::{
    metrics::register_metrics, ExpiryPolicy, SessionCache, SessionResolver, SweepHandle,
    SweepScheduler, TokenCleanupService,
};

/// Session services wired over one store.
///
/// The cache is created here and shared by reference; nothing reaches it
/// through a global.
pub struct SessionComponents {
    pub cache: Arc<SessionCache>,
    pub cleanup: TokenCleanupService,
    pub resolver: Arc<SessionResolver>,
    pub scheduler: SweepScheduler,
}

impl SessionComponents {
    /// Builds the session services from configuration.
    pub fn build(config: &SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        let policy = ExpiryPolicy::from_config(config);
        let cache = Arc::new(SessionCache::new(config.cache_ttl(), policy));
        let cleanup = TokenCleanupService::new(Arc::clone(&store), Arc::clone(&cache));
        let resolver = SessionResolver::new(Arc::clone(&cache), store, cleanup.clone(), policy)
            .with_opportunistic_cleanup(config.opportunistic_cleanup);
        let scheduler = SweepScheduler::new(cleanup.clone(), Arc::clone(&cache), policy.sweep_interval());

        Self {
            cache,
            cleanup,
            resolver: Arc::new(resolver),
            scheduler,
        }
    }
}

/// A built application, bound to its listener but not yet serving.
pub struct Application {
    listener: TcpListener,
    router: Router,
    sessions: SessionComponents,
    pool: Option<Arc<DatabasePool>>,
}

impl Application {
    /// Connects to the database and builds every component.
    pub async fn build(config: AppConfig) -> VitaeResult<Self> {
        let pool = create_pool(&config.database).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }

        let store: Arc<dyn SessionStore> = Arc::new(MySqlSessionStore::new(Arc::clone(&pool)));
        let health: Arc<dyn HealthCheck> = pool.clone();

        let mut app = Self::with_store(&config, store, vec![health]).await?;
        app.pool = Some(pool);
        Ok(app)
    }

    /// Builds the application over an existing store.
    pub async fn with_store(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        health_checks: Vec<Arc<dyn HealthCheck>>,
    ) -> VitaeResult<Self> {
        register_metrics();

        let sessions = SessionComponents::build(&config.session, store);
        let cookies = SessionCookies::from_config(&config.session.cookie, config.app.environment);
        if config.admin.api_key.is_none() {
            warn!("admin.api_key is not set, admin endpoints are unauthenticated");
        }

        let state = AppState::new(Arc::clone(&sessions.resolver), cookies, config.admin.clone())
            .with_health_checks(health_checks);
        let router = create_router(state, &config.server);

        let addr = config.server.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| VitaeError::Internal(format!("Failed to bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            router,
            sessions,
            pool: None,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> VitaeResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| VitaeError::Internal(format!("Failed to read local address: {e}")))
    }

    /// Session services of this application.
    pub fn sessions(&self) -> &SessionComponents {
        &self.sessions
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> VitaeResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` completes, then tears everything down.
    pub async fn run_until<F>(self, shutdown: F) -> VitaeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = self.sessions.scheduler.start()?;

        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| VitaeError::Internal(format!("HTTP server error: {e}")));

        teardown(sweeper, &self.sessions, self.pool.as_deref()).await;
        served
    }
}

/// Stops the sweeper, waits for background cleanup, empties the cache and
/// closes the pool, in that order.
async fn teardown(sweeper: SweepHandle, sessions: &SessionComponents, pool: Option<&DatabasePool>) {
    sweeper.stop().await;
    sessions.cleanup.drain().await;
    sessions.cache.clear();

    if let Some(pool) = pool {
        pool.close().await;
    }

    info!("Shutdown complete");
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;
    use vitae_core::{SessionRecord, SessionToken, SessionUser, UserId};
    use vitae_repository::InMemorySessionStore;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config
    }

    fn record(token: &str, minutes: i64) -> SessionRecord {
        SessionRecord::new(
            SessionToken::new(token),
            SessionUser {
                id: UserId::new("u1"),
                name: None,
                email: "u1@example.com".to_string(),
            },
            Utc::now() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn test_components_follow_config() {
        let session = SessionConfig {
            cache_ttl_secs: 60,
            sweep_interval_minutes: 2,
            ..SessionConfig::default()
        };
        let components = SessionComponents::build(&session, Arc::new(InMemorySessionStore::new()));

        assert_eq!(components.cache.ttl(), StdDuration::from_secs(60));
        assert_eq!(components.scheduler.interval(), StdDuration::from_secs(120));
        assert!(!components.scheduler.is_running());
    }

    #[tokio::test]
    async fn test_components_share_one_cache() {
        let store = Arc::new(InMemorySessionStore::with_sessions([record("abc", 30)]));
        let components = SessionComponents::build(&SessionConfig::default(), store);

        let resolution = components
            .resolver
            .resolve(Some(&SessionToken::new("abc")))
            .await
            .unwrap();
        assert!(resolution.is_authenticated());
        assert_eq!(components.cache.len(), 1);

        components.cleanup.drain().await;
    }

    #[tokio::test]
    async fn test_run_until_tears_down() {
        let store = Arc::new(InMemorySessionStore::with_sessions([record("abc", 30)]));
        let app = Application::with_store(&config(), store, Vec::new()).await.unwrap();
        assert_ne!(app.local_addr().unwrap().port(), 0);

        app.sessions()
            .resolver
            .resolve(Some(&SessionToken::new("abc")))
            .await
            .unwrap();
        let cache = Arc::clone(&app.sessions().cache);
        assert_eq!(cache.len(), 1);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(app.run_until(async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert!(cache.is_empty());
    }
}
