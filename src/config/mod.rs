use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::auth::MAX_EXPIRY_HOURS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Where user records live. With no `base_url` the in-memory store is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub base_url: Option<String>,
    pub service_key: Option<String>,
    pub fixture_path: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub expiry_hours: u64,
    pub gate_timeout_ms: u64,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub provider_url: Option<String>,
    pub upload_preset: Option<String>,
    pub api_key: Option<String>,
    pub default_folder: String,
    pub max_upload_bytes: usize,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub admin_service_key: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set outside development")]
    MissingSessionSecret,

    #[error("Invalid {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Gate timeout must be greater than zero")]
    ZeroGateTimeout,

    #[error("SESSION_EXPIRY_HOURS must be between 1 and {max}, got {value}")]
    InvalidSessionExpiry { value: u64, max: u64 },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("COPYTRADE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.server.log_level = v;
        }

        // Identity overrides
        if let Ok(v) = env::var("IDENTITY_URL") {
            self.identity.base_url = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_SERVICE_KEY") {
            self.identity.service_key = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_FIXTURE") {
            self.identity.fixture_path = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_REQUEST_TIMEOUT_MS") {
            self.identity.request_timeout_ms = v.parse().unwrap_or(self.identity.request_timeout_ms);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.session.secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.session.expiry_hours = v.parse().unwrap_or(self.session.expiry_hours);
        }
        if let Ok(v) = env::var("SESSION_GATE_TIMEOUT_MS") {
            self.session.gate_timeout_ms = v.parse().unwrap_or(self.session.gate_timeout_ms);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }

        // Media overrides
        if let Ok(v) = env::var("MEDIA_PROVIDER_URL") {
            self.media.provider_url = non_empty(v);
        }
        if let Ok(v) = env::var("MEDIA_UPLOAD_PRESET") {
            self.media.upload_preset = non_empty(v);
        }
        if let Ok(v) = env::var("MEDIA_API_KEY") {
            self.media.api_key = non_empty(v);
        }
        if let Ok(v) = env::var("MEDIA_DEFAULT_FOLDER") {
            self.media.default_folder = v;
        }
        if let Ok(v) = env::var("MEDIA_MAX_UPLOAD_BYTES") {
            self.media.max_upload_bytes = v.parse().unwrap_or(self.media.max_upload_bytes);
        }
        if let Ok(v) = env::var("MEDIA_REQUEST_TIMEOUT_MS") {
            self.media.request_timeout_ms = v.parse().unwrap_or(self.media.request_timeout_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("ADMIN_SERVICE_KEY") {
            self.security.admin_service_key = non_empty(v);
        }

        self
    }

    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.is_empty() {
            return Err(ConfigError::MissingSessionSecret);
        }
        if self.session.gate_timeout_ms == 0 {
            return Err(ConfigError::ZeroGateTimeout);
        }
        if self.session.expiry_hours == 0 || self.session.expiry_hours > MAX_EXPIRY_HOURS {
            return Err(ConfigError::InvalidSessionExpiry {
                value: self.session.expiry_hours,
                max: MAX_EXPIRY_HOURS,
            });
        }
        for (field, value) in [
            ("IDENTITY_URL", &self.identity.base_url),
            ("MEDIA_PROVIDER_URL", &self.media.provider_url),
        ] {
            if let Some(value) = value {
                if url::Url::parse(value).is_err() {
                    return Err(ConfigError::InvalidUrl { field, value: value.clone() });
                }
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.session.gate_timeout_ms)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                log_level: "debug".to_string(),
            },
            identity: IdentityConfig {
                base_url: None,
                service_key: None,
                fixture_path: None,
                request_timeout_ms: 10_000,
            },
            session: SessionConfig {
                secret: "development-session-secret".to_string(),
                expiry_hours: 24 * 7, // 1 week
                gate_timeout_ms: 5_000,
                cookie_name: "session".to_string(),
            },
            media: MediaConfig {
                provider_url: None,
                upload_preset: None,
                api_key: None,
                default_folder: "receipts".to_string(),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                request_timeout_ms: 30_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                admin_service_key: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                log_level: "info".to_string(),
            },
            identity: IdentityConfig {
                base_url: None,
                service_key: None,
                fixture_path: None,
                request_timeout_ms: 5_000,
            },
            session: SessionConfig {
                secret: String::new(),
                expiry_hours: 24,
                gate_timeout_ms: 5_000,
                cookie_name: "session".to_string(),
            },
            media: MediaConfig {
                provider_url: None,
                upload_preset: None,
                api_key: None,
                default_folder: "receipts".to_string(),
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
                request_timeout_ms: 20_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                admin_service_key: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                log_level: "info".to_string(),
            },
            identity: IdentityConfig {
                base_url: None,
                service_key: None,
                fixture_path: None,
                request_timeout_ms: 5_000,
            },
            session: SessionConfig {
                secret: String::new(),
                expiry_hours: 4,
                gate_timeout_ms: 3_000,
                cookie_name: "session".to_string(),
            },
            media: MediaConfig {
                provider_url: None,
                upload_preset: None,
                api_key: None,
                default_folder: "receipts".to_string(),
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
                request_timeout_ms: 15_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                admin_service_key: None,
            },
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.media.default_folder, "receipts");
        assert_eq!(config.session.cookie_name, "session");
        assert!(config.identity.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config_requires_secret() {
        let config = AppConfig::production();
        assert_eq!(config.validate(), Err(ConfigError::MissingSessionSecret));

        let mut config = AppConfig::production();
        config.session.secret = "s3cret".to_string();
        assert!(config.validate().is_ok());
        assert!(config.session.gate_timeout_ms < AppConfig::development().session.gate_timeout_ms);
    }

    #[test]
    fn test_validate_rejects_bad_urls_and_zero_timeout() {
        let mut config = AppConfig::development();
        config.identity.base_url = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { field: "IDENTITY_URL", .. })));

        let mut config = AppConfig::development();
        config.session.gate_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroGateTimeout));
    }

    #[test]
    fn test_validate_bounds_session_expiry() {
        let mut config = AppConfig::development();
        config.session.expiry_hours = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSessionExpiry { value: 0, .. })));

        config.session.expiry_hours = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSessionExpiry { .. })));

        config.session.expiry_hours = MAX_EXPIRY_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" key ".to_string()), Some("key".to_string()));
    }
}
