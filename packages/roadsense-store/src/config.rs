use crate::websocket::PING_INTERVAL;
use std::env;

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Store configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address
    pub bind_addr: String,
    /// Which persistence backend to use
    pub backend: StorageBackend,
    /// PostgreSQL database URL (required for the postgres backend)
    pub database_url: Option<String>,
    /// Maximum pooled database connections
    pub max_db_connections: u32,
    /// Queue depth per subscriber before it is considered too slow
    pub subscriber_buffer: usize,
    /// Idle timeout in seconds (for stale subscriber cleanup)
    pub heartbeat_timeout_seconds: i64,
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let database_url = env::var("DATABASE_URL").ok().or_else(postgres_url_from_parts);
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        Ok(Self {
            port: env::var("STORE_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            bind_addr: env::var("STORE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            backend,
            database_url,
            max_db_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            subscriber_buffer: env::var("SUBSCRIBER_BUFFER")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .unwrap_or(64),
            heartbeat_timeout_seconds: check_heartbeat_timeout(
                env::var("HEARTBEAT_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            )?,
        })
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Reject timeouts that do not outlast the WebSocket ping interval
fn check_heartbeat_timeout(seconds: i64) -> Result<i64, ConfigError> {
    let ping_seconds = PING_INTERVAL.as_secs() as i64;
    if seconds <= ping_seconds {
        return Err(ConfigError::InvalidValue(format!(
            "HEARTBEAT_TIMEOUT_SECONDS must be greater than the {} s ping interval, got {}",
            ping_seconds, seconds
        )));
    }
    Ok(seconds)
}

/// Compose a connection URL from the individual POSTGRES_* variables
fn postgres_url_from_parts() -> Option<String> {
    let user = env::var("POSTGRES_USER").ok()?;
    let password = env::var("POSTGRES_PASSWORD").ok()?;
    let db = env::var("POSTGRES_DB").ok()?;
    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());

    Some(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, db
    ))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_timeout_must_outlast_ping_interval() {
        assert!(matches!(
            check_heartbeat_timeout(10),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(check_heartbeat_timeout(PING_INTERVAL.as_secs() as i64).is_err());
        assert_eq!(check_heartbeat_timeout(300).unwrap(), 300);
    }
}
