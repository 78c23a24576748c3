/// Configuration management for the loyalty points backend
use crate::error::{PointsError, PointsResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub points: PointsConfig,
    pub seed: SeedConfig,
    pub rate_limit: RateLimitSettings,
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
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Bearer token lifetime in days
    pub token_ttl_days: i64,
    /// bcrypt work factor
    pub password_hash_cost: u32,
}

/// Points rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Balance credited to every new account
    pub welcome_bonus: i64,
}

/// Startup seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub default_codes: bool,
    pub admin_email: String,
    pub admin_name: String,
    /// Initial administrator is only created when a password is configured
    pub admin_password: Option<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PointsResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("LOYALTY_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("LOYALTY_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| PointsError::Validation("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let data_directory: PathBuf = env::var("LOYALTY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("LOYALTY_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("loyalty.sqlite"));
        let max_connections = env::var("LOYALTY_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("LOYALTY_JWT_SECRET")
            .map_err(|_| PointsError::Validation("JWT secret required".to_string()))?;
        let token_ttl_days = env::var("LOYALTY_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .map_err(|_| PointsError::Validation("Invalid token TTL".to_string()))?;
        let password_hash_cost = env::var("LOYALTY_PASSWORD_HASH_COST")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .map_err(|_| PointsError::Validation("Invalid password hash cost".to_string()))?;

        let welcome_bonus = env::var("LOYALTY_WELCOME_BONUS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|_| PointsError::Validation("Invalid welcome bonus".to_string()))?;

        let default_codes = env::var("LOYALTY_SEED_DEFAULT_CODES")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let admin_email = env::var("LOYALTY_ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@nortegas.com".to_string());
        let admin_name = env::var("LOYALTY_ADMIN_NAME")
            .unwrap_or_else(|_| "Administrador NorteGAS".to_string());
        let admin_password = env::var("LOYALTY_ADMIN_PASSWORD").ok().filter(|p| !p.is_empty());

        let rate_limit_enabled = env::var("LOYALTY_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("LOYALTY_RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("LOYALTY_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let burst_size = env::var("LOYALTY_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                max_connections,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_days,
                password_hash_cost,
            },
            points: PointsConfig { welcome_bonus },
            seed: SeedConfig {
                default_codes,
                admin_email,
                admin_name,
                admin_password,
            },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                burst_size,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PointsResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PointsError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(PointsError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_days <= 0 {
            return Err(PointsError::Validation(
                "Token TTL must be at least one day".to_string(),
            ));
        }

        if !(4..=31).contains(&self.authentication.password_hash_cost) {
            return Err(PointsError::Validation(
                "Password hash cost must be between 4 and 31".to_string(),
            ));
        }

        if self.points.welcome_bonus < 0 {
            return Err(PointsError::Validation(
                "Welcome bonus cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for tests: temporary database path, fixed secret, no seeding
    #[cfg(test)]
    pub fn for_tests(database: PathBuf) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 5000,
                version: "test".to_string(),
            },
            storage: StorageConfig {
                data_directory: database
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                database,
                max_connections: 5,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
                token_ttl_days: 7,
                password_hash_cost: 4,
            },
            points: PointsConfig { welcome_bonus: 100 },
            seed: SeedConfig {
                default_codes: false,
                admin_email: "admin@example.com".to_string(),
                admin_name: "Admin".to_string(),
                admin_password: None,
            },
            rate_limit: RateLimitSettings {
                enabled: false,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                burst_size: 50,
            },
        }
    }
}
