use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::reports::DEFAULT_LIMIT;

mod schema;

pub use schema::{ReportSchema, SchemaError};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub schema: ReportSchema,
    pub default_limit: i64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("NUTRITION_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));
        let timeout_ms = env::var("NUTRITION_QUERY_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let default_limit = env::var("NUTRITION_DEFAULT_LIMIT")
            .unwrap_or_else(|_| DEFAULT_LIMIT.to_string())
            .parse::<i64>()
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or(ConfigError::InvalidDefaultLimit)?;

        let schema = ReportSchema::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store: StoreConfig {
                database_path,
                timeout: Duration::from_millis(timeout_ms),
            },
            schema,
            default_limit,
        })
    }
}

const DEFAULT_DATABASE_PATH: &str = "intervensi_gizi.db";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the relational store and per-query limits.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidDefaultLimit,
    Schema(SchemaError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "NUTRITION_QUERY_TIMEOUT_MS must be a positive number of milliseconds"
            ),
            ConfigError::InvalidDefaultLimit => {
                write!(f, "NUTRITION_DEFAULT_LIMIT must be a positive integer")
            }
            ConfigError::Schema(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidDefaultLimit => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Schema(err) => Some(err),
        }
    }
}

impl From<SchemaError> for ConfigError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "NUTRITION_DATABASE_PATH",
            "NUTRITION_QUERY_TIMEOUT_MS",
            "NUTRITION_DEFAULT_LIMIT",
            "NUTRITION_REGION_TABLE",
            "NUTRITION_REGION_NAME_COLUMN",
            "NUTRITION_SEVERITY_COLUMN",
            "NUTRITION_GEOMETRY_COLUMN",
            "NUTRITION_BENEFICIARY_TABLE",
            "NUTRITION_BENEFICIARY_STATUS_COLUMN",
            "NUTRITION_BENEFICIARY_DISTRICT_COLUMN",
            "NUTRITION_FACILITY_TABLE",
            "NUTRITION_FACILITY_TYPE_COLUMN",
            "NUTRITION_FACILITY_DISTRICT_COLUMN",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.store.database_path,
            PathBuf::from("intervensi_gizi.db")
        );
        assert_eq!(config.store.timeout, Duration::from_secs(5));
        assert_eq!(config.default_limit, 5);
        assert_eq!(config.schema, ReportSchema::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_timeout_and_limit() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("NUTRITION_QUERY_TIMEOUT_MS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimeout)
        ));

        reset_env();
        env::set_var("NUTRITION_DEFAULT_LIMIT", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDefaultLimit)
        ));
        reset_env();
    }

    #[test]
    fn rejects_unsafe_table_identifier() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("NUTRITION_REGION_TABLE", "kecamatan; DROP TABLE balita");
        match AppConfig::load() {
            Err(ConfigError::Schema(SchemaError::InvalidIdentifier { variable, .. })) => {
                assert_eq!(variable, "NUTRITION_REGION_TABLE");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
        reset_env();
    }
}
