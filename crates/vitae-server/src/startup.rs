//! Server startup utilities.

use tracing::info;
use vitae_config::AppConfig;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
        _ __
 _   __(_) /_____ ____
| | / / / __/ __ `/ _ \
| |/ / / /_/ /_/ /  __/
|___/_/\__/\__,_/\___/

       session layer
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let addr = config.server.addr();
    let session = &config.session;

    info!("{}", separator);
    info!("Environment:     {}", config.app.environment);
    info!("REST API:        http://{}/api", addr);
    info!("Health:          http://{}/health", addr);
    info!(
        "Sessions:        lifetime {}m, cache TTL {}s, sweep every {}m",
        session.session_token_lifetime_minutes,
        session.cache_ttl_secs,
        session.sweep_interval_minutes
    );
    info!("Session cookie:  {}", session.cookie.name);
    info!("{}", separator);
}
