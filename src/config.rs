/// Configuration management for the SpeedPay service
use crate::error::{BankError, BankResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub minting: MintingConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for point-of-sale tokens
    pub jwt_secret: String,
    /// Lifetime of a point-of-sale token in seconds
    pub pos_token_ttl_secs: i64,
}

/// Identifier minting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintingConfig {
    /// Draws attempted before giving up on a space
    pub max_attempts: u32,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration for the mobile auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth_requests_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BankResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SPEEDPAY_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SPEEDPAY_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| BankError::Validation("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let data_directory: PathBuf = env::var("SPEEDPAY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("SPEEDPAY_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("speedpay.sqlite"));

        let jwt_secret = env::var("SPEEDPAY_JWT_SECRET")
            .map_err(|_| BankError::Validation("JWT secret required".to_string()))?;
        let pos_token_ttl_secs = env::var("SPEEDPAY_POS_TOKEN_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let max_attempts = env::var("SPEEDPAY_MINT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "16".to_string())
            .parse()
            .unwrap_or(16);

        let email = if let Ok(smtp_url) = env::var("SPEEDPAY_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SPEEDPAY_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("SPEEDPAY_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let auth_requests_per_minute = env::var("SPEEDPAY_RATE_LIMIT_AUTH_PER_MINUTE")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "speedpay=debug,tower_http=debug".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                pos_token_ttl_secs,
            },
            minting: MintingConfig { max_attempts },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                auth_requests_per_minute,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> BankResult<()> {
        if self.service.hostname.is_empty() {
            return Err(BankError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(BankError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.minting.max_attempts == 0 {
            return Err(BankError::Validation(
                "Mint attempts must be at least 1".to_string(),
            ));
        }

        if self.authentication.pos_token_ttl_secs <= 0 {
            return Err(BankError::Validation(
                "POS token lifetime must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration suitable for tests and local tooling
    pub fn for_testing() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8000,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123".to_string(),
                pos_token_ttl_secs: 3600,
            },
            minting: MintingConfig { max_attempts: 16 },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: false,
                auth_requests_per_minute: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::for_testing();
        assert!(config.validate().is_ok());

        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_testing();
        config.minting.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_testing();
        config.service.hostname.clear();
        assert!(config.validate().is_err());
    }
}
