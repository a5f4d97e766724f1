//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator, Environment};
use config::{Config, ConfigError, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use vitae_core::VitaeError;

/// Prefix of configuration environment variables, e.g. `VITAE__SERVER__PORT`.
pub const ENV_PREFIX: &str = "VITAE";

/// Variable selecting the environment-specific config file.
pub const ENVIRONMENT_VAR: &str = "VITAE_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: PathBuf,
    environment: Environment,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{config_dir}/default.toml` - Default values
    /// 2. `{config_dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{config_dir}/local.toml` - Uncommitted local overrides
    /// 4. Environment variables with the `VITAE__` prefix
    ///
    /// The environment comes from `VITAE_ENVIRONMENT` (default `development`).
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self, VitaeError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse().map_err(VitaeError::Configuration)?,
            Err(_) => Environment::default(),
        };

        Self::with_environment(config_dir, environment)
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, VitaeError> {
        Self::new("./config")
    }

    /// Creates a loader for an explicit environment.
    pub fn with_environment(
        config_dir: impl Into<PathBuf>,
        environment: Environment,
    ) -> Result<Self, VitaeError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir, environment)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
            environment,
        })
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk and environment.
    ///
    /// The previous configuration stays in place if the new one is invalid.
    pub async fn reload(&self) -> Result<(), VitaeError> {
        let new_config = Self::load_config(&self.config_dir, self.environment)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &Path, environment: Environment) -> Result<AppConfig, VitaeError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder()
            .set_default("app.environment", environment.as_str())
            .map_err(config_error)?;

        for stem in ["default", environment.as_str(), "local"] {
            let path = config_dir.join(format!("{stem}.toml"));
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        ConfigValidator::validate(&app_config)
            .map_err(|errors| VitaeError::Configuration(format_validation_errors(&errors)))?;

        Ok(app_config)
    }
}

fn config_error(err: ConfigError) -> VitaeError {
    VitaeError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_empty_directory_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_environment(dir.path(), Environment::Development).unwrap();

        let config = loader.get().await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.cookie.name, "session-token");
        assert_eq!(config.app.environment, Environment::Development);
    }

    #[tokio::test]
    async fn test_environment_file_overrides_default() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "[session]\nsweep_interval_minutes = 10\ncache_ttl_secs = 60\n",
        );
        write(&dir, "staging.toml", "[session]\nsweep_interval_minutes = 2\n");

        let loader = ConfigLoader::with_environment(dir.path(), Environment::Staging).unwrap();
        let config = loader.get().await;

        assert_eq!(config.session.sweep_interval_minutes, 2);
        assert_eq!(config.session.cache_ttl_secs, 60);
        assert_eq!(config.session.session_token_lifetime_minutes, 30);
        assert_eq!(config.app.environment, Environment::Staging);
    }

    #[tokio::test]
    async fn test_invalid_values_fail_fast() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[session]\ncache_ttl_secs = 0\n");

        let result = ConfigLoader::with_environment(dir.path(), Environment::Development);
        assert!(matches!(result, Err(VitaeError::Configuration(msg)) if msg.contains("cache_ttl_secs")));
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[admin]\napi_key = \"first\"\n");

        let loader = ConfigLoader::with_environment(dir.path(), Environment::Development).unwrap();
        assert_eq!(loader.get().await.admin.api_key.as_deref(), Some("first"));

        write(&dir, "local.toml", "[admin]\napi_key = \"second\"\n");
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.admin.api_key.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_environment(dir.path(), Environment::Development).unwrap();

        write(&dir, "local.toml", "[server]\nport = 0\n");
        assert!(loader.reload().await.is_err());
        assert_eq!(loader.get().await.server.port, 8080);
    }
}
