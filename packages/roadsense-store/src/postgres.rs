use crate::traits::{ProcessedDataStore, StoreError, StoreResult};
use crate::types::{ProcessedAgentData, ProcessedAgentDataRecord, RecordId};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// PostgreSQL implementation of ProcessedDataStore
pub struct PostgresDataStore {
    pool: PgPool,
}

impl PostgresDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema
    pub async fn initialize(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_agent_data (
                id SERIAL PRIMARY KEY,
                road_state TEXT NOT NULL,
                x DOUBLE PRECISION NOT NULL,
                y DOUBLE PRECISION NOT NULL,
                z DOUBLE PRECISION NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent rows, newest first
    pub async fn recent(&self, limit: i64) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, road_state, x, y, z, latitude, longitude, timestamp
            FROM processed_agent_data
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }
}

fn row_to_record(row: &PgRow) -> ProcessedAgentDataRecord {
    ProcessedAgentDataRecord {
        id: row.get::<i32, _>("id") as RecordId,
        road_state: row.get("road_state"),
        x: row.get("x"),
        y: row.get("y"),
        z: row.get("z"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        timestamp: row.get("timestamp"),
    }
}

fn to_db_id(id: RecordId) -> StoreResult<i32> {
    // SERIAL ids never leave the i32 range, so anything outside it cannot exist
    i32::try_from(id).map_err(|_| StoreError::NotFound(id))
}

#[async_trait]
impl ProcessedDataStore for PostgresDataStore {
    async fn insert_batch(
        &self,
        batch: &[ProcessedAgentData],
    ) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(batch.len());

        for item in batch {
            let agent = &item.agent_data;
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO processed_agent_data
                    (road_state, x, y, z, latitude, longitude, timestamp)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(&item.road_state)
            .bind(agent.accelerometer.x)
            .bind(agent.accelerometer.y)
            .bind(agent.accelerometer.z)
            .bind(agent.gps.latitude)
            .bind(agent.gps.longitude)
            .bind(agent.timestamp)
            .fetch_one(&mut *tx)
            .await?;

            records.push(ProcessedAgentDataRecord::from_processed(id as RecordId, item));
        }

        tx.commit().await?;
        Ok(records)
    }

    async fn get(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        let row = sqlx::query(
            r#"
            SELECT id, road_state, x, y, z, latitude, longitude, timestamp
            FROM processed_agent_data
            WHERE id = $1
            "#,
        )
        .bind(to_db_id(id)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        Ok(row_to_record(&row))
    }

    async fn list(&self) -> StoreResult<Vec<ProcessedAgentDataRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, road_state, x, y, z, latitude, longitude, timestamp
            FROM processed_agent_data
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn update(
        &self,
        id: RecordId,
        data: &ProcessedAgentData,
    ) -> StoreResult<ProcessedAgentDataRecord> {
        let agent = &data.agent_data;
        let row = sqlx::query(
            r#"
            UPDATE processed_agent_data
            SET road_state = $2,
                x = $3,
                y = $4,
                z = $5,
                latitude = $6,
                longitude = $7,
                timestamp = $8
            WHERE id = $1
            RETURNING id, road_state, x, y, z, latitude, longitude, timestamp
            "#,
        )
        .bind(to_db_id(id)?)
        .bind(&data.road_state)
        .bind(agent.accelerometer.x)
        .bind(agent.accelerometer.y)
        .bind(agent.accelerometer.z)
        .bind(agent.gps.latitude)
        .bind(agent.gps.longitude)
        .bind(agent.timestamp)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        Ok(row_to_record(&row))
    }

    async fn delete(&self, id: RecordId) -> StoreResult<ProcessedAgentDataRecord> {
        let row = sqlx::query(
            r#"
            DELETE FROM processed_agent_data
            WHERE id = $1
            RETURNING id, road_state, x, y, z, latitude, longitude, timestamp
            "#,
        )
        .bind(to_db_id(id)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        Ok(row_to_record(&row))
    }
}
