/// Configuration management for the booking backend
use crate::auth::expiry::resolve_duration_ms;
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
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
    pub jwt_secret: String,
    pub token_ttl: TokenTtlConfig,
    /// Lifetime of one-time verification codes (e.g. "5m")
    pub otc_ttl: String,
}

/// Per-role, per-token-kind lifetime table
///
/// Specs use `<integer><unit>` with unit in {m, h, d}. Administrators get no
/// refresh entry: the highest-privilege role re-authenticates with primary
/// credentials only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTtlConfig {
    pub patient_access: String,
    pub patient_refresh: String,
    pub clinician_access: String,
    pub clinician_refresh: String,
    pub admin_access: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MEDIBOOK_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("MEDIBOOK_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let version = env::var("MEDIBOOK_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("MEDIBOOK_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("MEDIBOOK_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("medibook.sqlite"));

        let jwt_secret = env::var("MEDIBOOK_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;

        let token_ttl = TokenTtlConfig {
            patient_access: env::var("MEDIBOOK_TTL_PATIENT_ACCESS")
                .unwrap_or_else(|_| "1d".to_string()),
            patient_refresh: env::var("MEDIBOOK_TTL_PATIENT_REFRESH")
                .unwrap_or_else(|_| "30d".to_string()),
            clinician_access: env::var("MEDIBOOK_TTL_CLINICIAN_ACCESS")
                .unwrap_or_else(|_| "1d".to_string()),
            clinician_refresh: env::var("MEDIBOOK_TTL_CLINICIAN_REFRESH")
                .unwrap_or_else(|_| "30d".to_string()),
            admin_access: env::var("MEDIBOOK_TTL_ADMIN_ACCESS")
                .unwrap_or_else(|_| "1d".to_string()),
        };

        let otc_ttl = env::var("MEDIBOOK_OTC_TTL").unwrap_or_else(|_| "5m".to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

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
                token_ttl,
                otc_ttl,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    ///
    /// Malformed duration specs are caught here, at startup, so they can
    /// never surface as per-request failures.
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        let ttl = &self.authentication.token_ttl;
        for spec in [
            &ttl.patient_access,
            &ttl.patient_refresh,
            &ttl.clinician_access,
            &ttl.clinician_refresh,
            &ttl.admin_access,
            &self.authentication.otc_ttl,
        ] {
            resolve_duration_ms(spec)?;
        }

        Ok(())
    }
}

#[cfg(test)]
impl ServerConfig {
    /// Fixed configuration for tests: deterministic key, in-memory database
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
                token_ttl: TokenTtlConfig {
                    patient_access: "1d".to_string(),
                    patient_refresh: "30d".to_string(),
                    clinician_access: "1d".to_string(),
                    clinician_refresh: "30d".to_string(),
                    admin_access: "1d".to_string(),
                },
                otc_ttl: "5m".to_string(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
