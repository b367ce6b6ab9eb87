pub mod config;
pub mod datasource;
pub mod error;
pub mod mqtt;
pub mod publisher;
pub mod runner;
pub mod types;

pub use config::{AgentConfig, ConfigError};
pub use datasource::{BatchSizeRange, CyclicBatchReader, SourceKind, SourcePaths};
pub use error::{AgentError, AgentResult};
pub use mqtt::MqttTransport;
pub use publisher::{OrderedPublisher, PublishReport, Topics, Transport};
pub use runner::AgentRunner;
pub use types::*;
