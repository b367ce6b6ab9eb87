use std::sync::Arc;
use std::time::Instant;

use crate::registry::SubscriberRegistry;
use crate::service::IngestionService;
use crate::traits::ProcessedDataStore;

/// Main store state shared across all handlers
pub struct StoreState {
    pub service: IngestionService,
    pub start_time: Instant,
}

impl StoreState {
    pub fn new(store: Arc<dyn ProcessedDataStore>, registry: SubscriberRegistry) -> Self {
        Self {
            service: IngestionService::new(store, registry),
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
