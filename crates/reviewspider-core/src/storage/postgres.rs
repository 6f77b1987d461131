use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use super::PrimaryStore;
use crate::error::{Result, ReviewError};
use crate::model::{DatasetKey, ReviewRecord};

const BACKEND: &str = "postgres";

/// Reviews as JSONB documents in one table, partitioned by dataset key.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS review_records (
                id BIGSERIAL PRIMARY KEY,
                dataset_key TEXT NOT NULL,
                record JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS review_records_key_idx ON review_records (dataset_key)")
            .execute(&self.pool)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for PostgresStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(())
    }

    async fn insert(&self, key: &DatasetKey, records: &[ReviewRecord]) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        for record in records {
            let document = serde_json::to_value(record).map_err(|e| ReviewError::unavailable(BACKEND, e))?;
            sqlx::query("INSERT INTO review_records (dataset_key, record) VALUES ($1, $2)")
                .bind(key.as_str())
                .bind(document)
                .execute(&mut *tx)
                .await
                .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        }

        tx.commit().await.map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(records.len())
    }

    async fn find(&self, key: &DatasetKey) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT record FROM review_records WHERE dataset_key = $1 ORDER BY id ASC
            "#,
        )
        .bind(key.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        rows.into_iter()
            .map(|row| {
                let value: serde_json::Value = row
                    .try_get("record")
                    .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
                serde_json::from_value(value).map_err(|e| ReviewError::unavailable(BACKEND, e))
            })
            .collect()
    }

    async fn keys(&self) -> Result<Vec<DatasetKey>> {
        let rows = sqlx::query("SELECT DISTINCT dataset_key FROM review_records ORDER BY dataset_key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row
                .try_get("dataset_key")
                .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
            if let Some(key) = DatasetKey::from_stored(&raw) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
