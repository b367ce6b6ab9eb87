use async_trait::async_trait;
use crate::types::{ProcessedAgentData, ProcessedAgentDataRecord, RecordId};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(RecordId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable table of processed records keyed by numeric id
#[async_trait]
pub trait ProcessedDataStore: Send + Sync {
    /// Insert every record of a batch, returning the stored rows in input order
    async fn insert_batch(
        &self,
        batch: &[ProcessedAgentData],
    ) -> StoreResult<Vec<ProcessedAgentDataRecord>>;

    /// Get a single row
    async fn get(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord>;

    /// List all rows ordered by id
    async fn list(&self) -> StoreResult<Vec<ProcessedAgentDataRecord>>;

    /// Overwrite every field of an existing row
    async fn update(
        &self,
        id: RecordId,
        data: &ProcessedAgentData,
    ) -> StoreResult<ProcessedAgentDataRecord>;

    /// Remove a row, returning it as it was before removal
    async fn delete(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord>;
}
