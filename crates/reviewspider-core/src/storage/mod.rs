pub mod local;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{Result, ReviewError};
use crate::model::{Dataset, DatasetKey, ReviewRecord};

pub use self::local::LocalStore;
pub use self::postgres::PostgresStore;
pub use self::redis::RedisStore;

/// A networked store holding datasets by key.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<()>;

    /// Appends all records under `key`; either the whole batch lands or none of it.
    async fn insert(&self, key: &DatasetKey, records: &[ReviewRecord]) -> Result<usize>;

    async fn find(&self, key: &DatasetKey) -> Result<Vec<ReviewRecord>>;

    async fn keys(&self) -> Result<Vec<DatasetKey>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// Nothing to store.
    Skipped,
    Primary { store: &'static str, rows: usize },
    Local { path: PathBuf, rows: usize },
}

/// Stores and retrieves datasets, degrading to the local store when the
/// primary one is missing or failing.
pub struct PersistenceGateway {
    primary: Option<Arc<dyn PrimaryStore>>,
    local: LocalStore,
    offline: AtomicBool,
    remember_offline: bool,
}

impl PersistenceGateway {
    pub fn new(primary: Option<Arc<dyn PrimaryStore>>, local: LocalStore, remember_offline: bool) -> Self {
        let offline = primary.is_none();
        Self {
            primary,
            local,
            offline: AtomicBool::new(offline),
            remember_offline,
        }
    }

    pub fn offline(local: LocalStore) -> Self {
        Self::new(None, local, true)
    }

    /// Never fails: anything that prevents reaching the primary store starts the gateway offline.
    pub async fn connect(config: &StoreConfig) -> Self {
        let local = LocalStore::new(config.backup_dir.clone());

        if config.force_offline {
            tracing::warn!("Offline mode requested, reviews go to {}", local.dir().display());
            return Self::offline(local);
        }
        let Some(url) = config.url.as_deref() else {
            tracing::warn!("No store URL configured, starting in offline mode");
            return Self::offline(local);
        };

        match open_primary(url, config).await {
            Ok(primary) => {
                tracing::info!("Connected to {} store", primary.backend());
                Self::new(Some(primary), local, config.remember_offline)
            }
            Err(e) => {
                tracing::warn!("Primary store unavailable, starting in offline mode: {}", e);
                Self::offline(local)
            }
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::Release);
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    fn active_primary(&self) -> Option<&Arc<dyn PrimaryStore>> {
        if self.is_offline() {
            None
        } else {
            self.primary.as_ref()
        }
    }

    /// Logs the failure, flips offline if configured, and hands the error back
    /// so it can be reported if the local store fails too.
    fn primary_failed(&self, operation: &str, error: ReviewError) -> ReviewError {
        tracing::warn!("Primary store {} failed, using local store: {}", operation, error);
        if self.remember_offline {
            self.go_offline();
        }
        error
    }

    pub async fn store(&self, product_name: &str, dataset: &Dataset) -> Result<StoreOutcome> {
        let key = DatasetKey::from_product_name(product_name)?;

        if dataset.is_empty() {
            tracing::warn!("Empty dataset for {}, nothing to store", key);
            return Ok(StoreOutcome::Skipped);
        }

        let mut primary_error = None;
        if let Some(primary) = self.active_primary() {
            match primary.insert(&key, dataset.records()).await {
                Ok(rows) => {
                    tracing::info!("Stored {} reviews for {} in {}", rows, key, primary.backend());
                    return Ok(StoreOutcome::Primary {
                        store: primary.backend(),
                        rows,
                    });
                }
                Err(e) => primary_error = Some(self.primary_failed("insert", e)),
            }
        }

        let path = self
            .local
            .write(&key, dataset)
            .await
            .map_err(|e| both_failed(primary_error, e))?;
        tracing::info!("Stored {} reviews for {} locally at {}", dataset.len(), key, path.display());
        Ok(StoreOutcome::Local {
            path,
            rows: dataset.len(),
        })
    }

    /// An unknown key yields an empty, schemaless dataset.
    pub async fn retrieve(&self, product_name: &str) -> Result<Dataset> {
        let key = DatasetKey::from_product_name(product_name)?;

        let mut primary_error = None;
        if let Some(primary) = self.active_primary() {
            match primary.find(&key).await {
                Ok(records) => return Ok(Dataset::from_stored(records)),
                Err(e) => primary_error = Some(self.primary_failed("find", e)),
            }
        }

        let stored = self
            .local
            .read(&key)
            .await
            .map_err(|e| both_failed(primary_error, e))?;
        match stored {
            Some(dataset) => {
                tracing::info!("Loaded {} reviews for {} from local store", dataset.len(), key);
                Ok(dataset)
            }
            None => {
                tracing::info!("No local data for {}", key);
                Ok(Dataset::schemaless())
            }
        }
    }

    pub async fn known_products(&self) -> Result<Vec<DatasetKey>> {
        let mut primary_error = None;
        if let Some(primary) = self.active_primary() {
            match primary.keys().await {
                Ok(keys) => return Ok(keys),
                Err(e) => primary_error = Some(self.primary_failed("keys", e)),
            }
        }
        self.local
            .keys()
            .await
            .map_err(|e| both_failed(primary_error, e))
    }
}

/// A local failure after a primary failure is reported as the primary being
/// unavailable, with the local reason appended.
fn both_failed(primary_error: Option<ReviewError>, local_error: ReviewError) -> ReviewError {
    match primary_error {
        Some(ReviewError::BackendUnavailable { backend, reason }) => ReviewError::BackendUnavailable {
            backend,
            reason: format!("{}; local fallback failed: {}", reason, local_error),
        },
        Some(other) => ReviewError::unavailable(
            "primary",
            format!("{}; local fallback failed: {}", other, local_error),
        ),
        None => local_error,
    }
}

async fn open_primary(url: &str, config: &StoreConfig) -> Result<Arc<dyn PrimaryStore>> {
    let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or_default();
    let primary: Arc<dyn PrimaryStore> = match scheme {
        "redis" | "rediss" => Arc::new(RedisStore::from_url(url)?),
        "postgres" | "postgresql" => Arc::new(PostgresStore::connect(url, config.connect_timeout).await?),
        other => {
            return Err(ReviewError::unavailable(
                "primary",
                format!("unsupported store scheme `{}`", other),
            ))
        }
    };

    tokio::time::timeout(config.connect_timeout, primary.ping())
        .await
        .map_err(|_| ReviewError::unavailable(primary.backend(), "connection probe timed out"))??;
    Ok(primary)
}
