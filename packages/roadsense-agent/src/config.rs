use crate::datasource::SourcePaths;
use crate::publisher::Topics;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Agent configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// MQTT broker host
    pub mqtt_host: String,
    /// MQTT broker port
    pub mqtt_port: u16,
    /// Client identifier presented to the broker
    pub mqtt_client_id: String,
    pub topics: Topics,
    /// Pause between batches
    pub delay: Duration,
    pub batch_size_min: usize,
    pub batch_size_max: usize,
    pub sources: SourcePaths,
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let delay_seconds: f64 = parse_var("DELAY", 0.1)?;
        if !delay_seconds.is_finite() || delay_seconds < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "DELAY must be a non-negative number of seconds, got {}",
                delay_seconds
            )));
        }

        let batch_size_min: usize = parse_var("BATCH_SIZE_MIN", 5)?;
        let batch_size_max: usize = parse_var("BATCH_SIZE_MAX", 25)?;
        if batch_size_min == 0 || batch_size_min > batch_size_max {
            return Err(ConfigError::InvalidValue(format!(
                "batch size range {}..={} is invalid",
                batch_size_min, batch_size_max
            )));
        }

        Ok(Self {
            mqtt_host: env::var("MQTT_BROKER_HOST").unwrap_or_else(|_| "localhost".to_string()),
            mqtt_port: env::var("MQTT_BROKER_PORT")
                .unwrap_or_else(|_| "1883".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            mqtt_client_id: env::var("MQTT_CLIENT_ID")
                .unwrap_or_else(|_| "roadsense-agent".to_string()),
            topics: Topics {
                accelerometer: env::var("MQTT_ACCELEROMETER_TOPIC")
                    .unwrap_or_else(|_| "agent_accelerometer_topic".to_string()),
                gps: env::var("MQTT_GPS_TOPIC").unwrap_or_else(|_| "agent_gps_topic".to_string()),
                parking: env::var("MQTT_PARKING_TOPIC")
                    .unwrap_or_else(|_| "agent_parking_topic".to_string()),
            },
            delay: Duration::from_secs_f64(delay_seconds),
            batch_size_min,
            batch_size_max,
            sources: SourcePaths::new(
                env::var("ACCELEROMETER_FILE")
                    .unwrap_or_else(|_| "data/accelerometer.csv".to_string()),
                env::var("GPS_FILE").unwrap_or_else(|_| "data/gps.csv".to_string()),
                env::var("PARKING_FILE").unwrap_or_else(|_| "data/parking.csv".to_string()),
            ),
        })
    }

    /// Get the broker address (host:port)
    pub fn broker_address(&self) -> String {
        format!("{}:{}", self.mqtt_host, self.mqtt_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value '{}'", name, value))),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
