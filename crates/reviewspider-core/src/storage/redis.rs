use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};

use super::PrimaryStore;
use crate::error::{Result, ReviewError};
use crate::model::{DatasetKey, ReviewRecord};

const BACKEND: &str = "redis";

/// Each dataset is a Redis list of JSON documents, one per review.
pub struct RedisStore {
    pool: Pool,
    prefix: String,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            prefix: "reviewspider:dataset:".to_string(),
        }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(Self::new(pool))
    }

    fn list_key(&self, key: &DatasetKey) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))
    }
}

#[async_trait]
impl PrimaryStore for RedisStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(())
    }

    async fn insert(&self, key: &DatasetKey, records: &[ReviewRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let documents = records
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        let mut conn = self.connection().await?;
        // A single RPUSH appends the whole batch or nothing.
        let _: i64 = conn
            .rpush(self.list_key(key), documents)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;
        Ok(records.len())
    }

    async fn find(&self, key: &DatasetKey) -> Result<Vec<ReviewRecord>> {
        let mut conn = self.connection().await?;
        let documents: Vec<String> = conn
            .lrange(self.list_key(key), 0, -1)
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReviewError::unavailable(BACKEND, format!("corrupt document under {}: {}", key, e)))
    }

    async fn keys(&self) -> Result<Vec<DatasetKey>> {
        let mut conn = self.connection().await?;
        let raw: Vec<String> = conn
            .keys(format!("{}*", self.prefix))
            .await
            .map_err(|e| ReviewError::unavailable(BACKEND, e))?;

        let mut keys: Vec<_> = raw
            .iter()
            .filter_map(|k| k.strip_prefix(&self.prefix))
            .filter_map(DatasetKey::from_stored)
            .collect();
        keys.sort();
        Ok(keys)
    }
}
