/// Configuration management for the Gatherly service
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authorization: AuthorizationConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Per-request deadline applied by the timeout layer
    pub request_timeout_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authorization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// User id(s) granted Admin at bootstrap (comma-separated in env)
    pub admin_ids: Vec<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub read_rps: u32,
    pub write_rps: u32,
    pub moderation_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("GATHERLY_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("GATHERLY_PORT")
            .unwrap_or_else(|_| "4810".to_string())
            .parse()
            .map_err(|_| ServiceError::Validation("Invalid port number".to_string()))?;
        let request_timeout_secs = env::var("GATHERLY_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let data_directory: PathBuf = env::var("GATHERLY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("GATHERLY_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("gatherly.sqlite"));

        // Parse bootstrap admin ids from comma-separated list
        let admin_ids = env::var("GATHERLY_ADMIN_IDS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let rate_limit_enabled = env::var("GATHERLY_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let read_rps = env::var("GATHERLY_RATE_LIMIT_READ_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let write_rps = env::var("GATHERLY_RATE_LIMIT_WRITE_RPS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .unwrap_or(25);
        let moderation_rps = env::var("GATHERLY_RATE_LIMIT_MODERATION_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let burst_size = env::var("GATHERLY_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                request_timeout_secs,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authorization: AuthorizationConfig { admin_ids },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
                read_rps,
                write_rps,
                moderation_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ServiceError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.service.request_timeout_secs == 0 {
            return Err(ServiceError::Validation(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 4810,
                request_timeout_secs: 30,
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/gatherly.sqlite".into(),
            },
            authorization: AuthorizationConfig {
                admin_ids: vec!["root-admin".to_string()],
            },
            rate_limit: RateLimitSettings {
                enabled: true,
                read_rps: 100,
                write_rps: 25,
                moderation_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_hostname() {
        let mut config = base_config();
        config.service.hostname = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = base_config();
        config.service.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
