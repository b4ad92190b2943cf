//! Batch record persistence on the `batches` table.
//!
//! The record is kept as one JSONB document. Key order is not preserved by
//! JSONB, which is fine: fingerprints are taken over the canonical form.

use async_trait::async_trait;
use harvest_core::{BatchId, BatchRecord};
use harvest_registry::{RecordStore, StoreError};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn decode(key: &str, value: Value) -> Result<BatchRecord, StoreError> {
    BatchRecord::from_value(value).map_err(|e| StoreError::Corrupt {
        id: key.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, id: &BatchId) -> Result<Option<BatchRecord>, StoreError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT record FROM batches WHERE batch_id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        row.map(|(Json(value),)| decode(id.as_str(), value))
            .transpose()
    }

    async fn insert(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO batches (batch_id, record, created_at, updated_at)
             VALUES ($1, $2, now(), now())
             ON CONFLICT (batch_id) DO NOTHING",
        )
        .bind(id.as_str())
        .bind(Json(record))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(id.clone()));
        }
        Ok(())
    }

    async fn put(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO batches (batch_id, record, created_at, updated_at)
             VALUES ($1, $2, now(), now())
             ON CONFLICT (batch_id) DO UPDATE SET record = EXCLUDED.record, updated_at = now()",
        )
        .bind(id.as_str())
        .bind(Json(record))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BatchRecord>, StoreError> {
        let rows: Vec<(String, Json<Value>)> =
            sqlx::query_as("SELECT batch_id, record FROM batches ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        rows.into_iter()
            .map(|(key, Json(value))| decode(&key, value))
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
