//! Configuration validation module.
//!
//! Every rule is checked and all violations are reported together, so a
//! misconfigured deployment fails once at startup with the full list.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A duration must be positive.
    NonPositiveDuration { name: String, value: i64 },
    /// A duration exceeds its upper bound.
    DurationTooLarge { name: String, value: i64, maximum: i64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
    /// Session cookie name is empty or contains forbidden characters.
    InvalidCookieName { value: String },
    /// Admin API key is configured but empty.
    EmptyAdminKey,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveDuration { name, value } => {
                write!(f, "Duration '{}' must be positive, got {}", name, value)
            }
            Self::DurationTooLarge { name, value, maximum } => {
                write!(f, "Duration '{}' is {}, maximum is {}", name, value, maximum)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
            Self::InvalidCookieName { value } => {
                write!(f, "Invalid session cookie name: '{}'", value)
            }
            Self::EmptyAdminKey => write!(f, "admin.api_key is set but empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Upper bound for minute-valued session durations (one year).
    const MAX_DURATION_MINUTES: i64 = 525_600;
    /// Upper bound for the cache TTL (one year).
    const MAX_CACHE_TTL_SECS: i64 = 31_536_000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_app(config, &mut errors);
        Self::validate_server(config, &mut errors);
        Self::validate_database(config, &mut errors);
        Self::validate_session(config, &mut errors);
        Self::validate_admin(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_app(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if let Some(ref base_url) = config.app.base_url {
            match Url::parse(base_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "base_url".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                    url_type: "base_url".to_string(),
                    message: e.to_string(),
                }),
            }
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.server.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.server.port,
            });
        }

        if config.server.request_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "server.request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_database(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let db = &config.database;

        if db.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !db.url.starts_with("mysql://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }

        if db.min_connections > db.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: db.min_connections,
                max: db.max_connections,
            });
        }
        if db.max_connections > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: db.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if db.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_session(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let session = &config.session;

        let durations = [
            (
                "session.session_token_lifetime_minutes",
                session.session_token_lifetime_minutes,
                Self::MAX_DURATION_MINUTES,
            ),
            (
                "session.magic_link_token_lifetime_minutes",
                session.magic_link_token_lifetime_minutes,
                Self::MAX_DURATION_MINUTES,
            ),
            (
                "session.sweep_interval_minutes",
                i64::try_from(session.sweep_interval_minutes).unwrap_or(i64::MAX),
                Self::MAX_DURATION_MINUTES,
            ),
            (
                "session.cache_ttl_secs",
                i64::try_from(session.cache_ttl_secs).unwrap_or(i64::MAX),
                Self::MAX_CACHE_TTL_SECS,
            ),
        ];

        for (name, value, maximum) in durations {
            if value <= 0 {
                errors.push(ConfigValidationError::NonPositiveDuration {
                    name: name.to_string(),
                    value,
                });
            } else if value > maximum {
                errors.push(ConfigValidationError::DurationTooLarge {
                    name: name.to_string(),
                    value,
                    maximum,
                });
            }
        }

        let name = &session.cookie.name;
        let forbidden = |c: char| c.is_whitespace() || c.is_control() || "=;,\"".contains(c);
        if name.is_empty() || name.chars().any(forbidden) {
            errors.push(ConfigValidationError::InvalidCookieName { value: name.clone() });
        }
    }

    fn validate_admin(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if matches!(config.admin.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            errors.push(ConfigValidationError::EmptyAdminKey);
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let level = config.observability.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.observability.log_level.clone(),
            });
        }

        let format = config.observability.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.observability.log_format.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
