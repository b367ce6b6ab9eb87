pub mod cli;
pub mod client;
pub mod config;
pub mod handlers;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod service;
pub mod state;
pub mod traits;
pub mod types;
pub mod websocket;

pub use client::StoreApiClient;
pub use config::{ConfigError, StorageBackend, StoreConfig};
pub use handlers::create_router;
pub use memory::MemoryDataStore;
pub use postgres::PostgresDataStore;
pub use registry::{BroadcastReport, SubscriberId, SubscriberRegistry};
pub use service::IngestionService;
pub use state::StoreState;
pub use traits::{ProcessedDataStore, StoreError, StoreResult};
pub use types::*;
pub use websocket::handle_websocket;
