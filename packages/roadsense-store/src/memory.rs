use crate::traits::{ProcessedDataStore, StoreError, StoreResult};
use crate::types::{ProcessedAgentData, ProcessedAgentDataRecord, RecordId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory implementation of ProcessedDataStore
///
/// Ids start at 1 and are never reused, matching a SERIAL column.
#[derive(Default)]
pub struct MemoryDataStore {
    inner: RwLock<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    rows: BTreeMap<RecordId, ProcessedAgentDataRecord>,
    last_id: RecordId,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

#[async_trait]
impl ProcessedDataStore for MemoryDataStore {
    async fn insert_batch(
        &self,
        batch: &[ProcessedAgentData],
    ) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        // Single write guard so the batch lands as one unit
        let mut table = self.inner.write();
        let mut records = Vec::with_capacity(batch.len());

        for item in batch {
            table.last_id += 1;
            let record = ProcessedAgentDataRecord::from_processed(table.last_id, item);
            table.rows.insert(record.id, record.clone());
            records.push(record);
        }

        Ok(records)
    }

    async fn get(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        self.inner
            .read()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        Ok(self.inner.read().rows.values().cloned().collect())
    }

    async fn update(
        &self,
        id: RecordId,
        data: &ProcessedAgentData,
    ) -> StoreResult<ProcessedAgentDataRecord> {
        let mut table = self.inner.write();
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        *row = ProcessedAgentDataRecord::from_processed(id, data);
        Ok(row.clone())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        self.inner
            .write()
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccelerometerData, AgentData, GpsData};
    use chrono::Utc;

    fn sample(road_state: &str) -> ProcessedAgentData {
        ProcessedAgentData {
            road_state: road_state.to_string(),
            agent_data: AgentData {
                accelerometer: AccelerometerData { x: 1.0, y: 2.0, z: 3.0 },
                gps: GpsData { latitude: 50.45, longitude: 30.52 },
                timestamp: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryDataStore::new();

        let first = store.insert_batch(&[sample("normal"), sample("bump")]).await.unwrap();
        let second = store.insert_batch(&[sample("pothole")]).await.unwrap();

        assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second[0].id, 3);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = MemoryDataStore::new();
        store.insert_batch(&[sample("normal"), sample("bump")]).await.unwrap();

        store.delete(2).await.unwrap();
        let next = store.insert_batch(&[sample("normal")]).await.unwrap();

        assert_eq!(next[0].id, 3);
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let store = MemoryDataStore::new();
        store.insert_batch(&[sample("normal")]).await.unwrap();

        let mut replacement = sample("pothole");
        replacement.agent_data.gps.latitude = 1.5;
        let updated = store.update(1, &replacement).await.unwrap();

        assert_eq!(updated.road_state, "pothole");
        assert_eq!(updated.latitude, 1.5);
        assert_eq!(store.get(1).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = MemoryDataStore::new();

        assert!(matches!(store.get(9).await, Err(StoreError::NotFound(9))));
        assert!(matches!(store.update(9, &sample("x")).await, Err(StoreError::NotFound(9))));
        assert!(matches!(store.delete(9).await, Err(StoreError::NotFound(9))));
        assert!(store.is_empty());
    }
}
