//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
    /// DynamoDB (requires the `dynamo` build feature)
    Dynamo,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else if s.eq_ignore_ascii_case("dynamo") {
            Self::Dynamo
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// Base host short URLs are formed from (default: http://localhost:{port})
    pub base_url: String,
    /// Length of auto-generated codes, 3–6 (default: 6)
    pub code_length: usize,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(v) => v.parse::<u16>().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("not a valid port number: {v}"),
            })?,
            Err(_) => 3001,
        };

        let base_url = env::var("BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let code_length = match env::var("CODE_LENGTH") {
            Ok(v) => {
                let n = v.parse::<usize>().map_err(|_| ConfigError {
                    field: "CODE_LENGTH",
                    message: format!("not a number: {v}"),
                })?;
                if !(3..=6).contains(&n) {
                    return Err(ConfigError {
                        field: "CODE_LENGTH",
                        message: format!("must be between 3 and 6, got {n}"),
                    });
                }
                n
            }
            Err(_) => 6,
        };

        let cors_allow_origin = {
            let raw = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string());
            HeaderValue::from_str(&raw).map_err(|_| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("not a valid header value: {raw}"),
            })?
        };

        let storage_provider = StorageProvider::from_str(
            &env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "memory".to_string()),
        );

        let db_path = PathBuf::from(
            env::var("DB_PATH").unwrap_or_else(|_| "./data/links.db".to_string()),
        );

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()));

        Ok(Self {
            port,
            base_url,
            code_length,
            cors_allow_origin,
            storage_provider,
            db_path,
            log_format,
        })
    }
}
