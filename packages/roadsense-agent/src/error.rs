use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while loading or publishing telemetry
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error(
        "Source lengths differ: accelerometer={accelerometer}, gps={gps}, parking={parking}"
    )]
    DataMismatch {
        accelerometer: usize,
        gps: usize,
        parking: usize,
    },

    #[error("No data loaded")]
    NoDataLoaded,

    #[error("Invalid data in '{source_name}' at line {line}: {reason}")]
    Validation {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
