use crate::registry::{BroadcastReport, SubscriberRegistry};
use crate::traits::{ProcessedDataStore, StoreResult};
use crate::types::{ProcessedAgentData, ProcessedAgentDataRecord, RecordId};
use std::sync::Arc;
use tracing::{error, info};

/// Persists processed batches and fans them out to live subscribers
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn ProcessedDataStore>,
    registry: SubscriberRegistry,
}

impl IngestionService {
    pub fn new(store: Arc<dyn ProcessedDataStore>, registry: SubscriberRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Persist a batch, then broadcast it to every open subscriber
    ///
    /// Nothing is broadcast when persistence fails. Subscribers receive
    /// batches in the order their `create` calls complete, which for
    /// overlapping calls may differ from the order ids were assigned.
    pub async fn create(
        &self,
        batch: Vec<ProcessedAgentData>,
    ) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        let records = self.store.insert_batch(&batch).await?;
        info!("Persisted batch of {} records", records.len());

        match self.registry.broadcast(&batch) {
            Ok(BroadcastReport { delivered, dropped }) => {
                if delivered + dropped > 0 {
                    info!(
                        "Broadcast batch to {} subscribers ({} dropped)",
                        delivered, dropped
                    );
                }
            }
            // Rows are already committed
            Err(e) => error!("Failed to serialize batch for broadcast: {}", e),
        }

        Ok(records)
    }

    pub async fn read(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        self.store.list().await
    }

    pub async fn update(
        &self,
        id: RecordId,
        data: ProcessedAgentData,
    ) -> StoreResult<ProcessedAgentDataRecord> {
        self.store.update(id, &data).await
    }

    pub async fn delete(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        self.store.delete(id).await
    }
}
