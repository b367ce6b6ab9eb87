use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier assigned to a persisted row
pub type RecordId = i64;

const TIMESTAMP_ERROR: &str =
    "Invalid timestamp format. Expected ISO 8601 format (YYYY-MM-DDTHH:MM:SSZ).";

/// Accelerometer axes as reported by the upstream classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// GPS position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw agent readings captured at a single instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub accelerometer: AccelerometerData,
    pub gps: GpsData,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Agent readings plus the road-surface label assigned downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAgentData {
    pub road_state: String,
    pub agent_data: AgentData,
}

/// Flattened row as stored by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAgentDataRecord {
    pub id: RecordId,
    pub road_state: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl ProcessedAgentDataRecord {
    /// Flatten a processed record into a row with the given identity
    pub fn from_processed(id: RecordId, data: &ProcessedAgentData) -> Self {
        let agent = &data.agent_data;
        Self {
            id,
            road_state: data.road_state.clone(),
            x: agent.accelerometer.x,
            y: agent.accelerometer.y,
            z: agent.accelerometer.z,
            latitude: agent.gps.latitude,
            longitude: agent.gps.longitude,
            timestamp: agent.timestamp,
        }
    }
}

/// Acknowledgement returned by the create endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub message: String,
    pub ids: Vec<RecordId>,
}

/// Error body returned by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Lifecycle of a live observer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberState {
    Connecting,
    Open,
    Closed,
}

/// Parse an ISO 8601 timestamp. Offsets are honoured; naive values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(TIMESTAMP_ERROR))
}
