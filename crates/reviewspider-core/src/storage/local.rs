use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, ReviewError};
use crate::model::{Dataset, DatasetKey, ReviewRecord, REVIEW_COLUMNS};

const EXTENSION: &str = "csv";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// One CSV file per dataset key under a backup directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &DatasetKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key.as_str(), EXTENSION))
    }

    /// Replaces whatever was stored under `key`.
    pub async fn write(&self, key: &DatasetKey, dataset: &Dataset) -> Result<PathBuf> {
        let fail = |e: &dyn std::fmt::Display| ReviewError::local_store(key.as_str(), e);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(REVIEW_COLUMNS).map_err(|e| fail(&e))?;
        for record in dataset.records() {
            writer.serialize(record).map_err(|e| fail(&e))?;
        }
        let bytes = writer.into_inner().map_err(|e| fail(&e))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| fail(&e))?;
        let path = self.path_for(key);
        // Concurrent writers to one key each stage their own file; the last rename wins.
        let staging = path.with_extension(format!(
            "{}.{}.{}.tmp",
            EXTENSION,
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(fail(&e));
        }
        tokio::fs::rename(&staging, &path).await.map_err(|e| fail(&e))?;
        Ok(path)
    }

    /// `None` when nothing was ever stored under `key`.
    pub async fn read(&self, key: &DatasetKey) -> Result<Option<Dataset>> {
        let fail = |e: &dyn std::fmt::Display| ReviewError::local_store(key.as_str(), e);

        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(fail(&e)),
        };

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().map_err(|e| fail(&e))?;
        if !headers.iter().eq(REVIEW_COLUMNS) {
            return Err(fail(&format!("unexpected columns {:?}", headers)));
        }

        let records = reader
            .deserialize::<ReviewRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| fail(&e))?;
        Ok(Some(Dataset::from_records(records)))
    }

    /// Keys of every stored file, sorted. A missing directory means no keys.
    pub async fn keys(&self) -> Result<Vec<DatasetKey>> {
        let fail = |e: &dyn std::fmt::Display| ReviewError::local_store(self.dir.display().to_string(), e);

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(fail(&e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| fail(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(DatasetKey::from_stored)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_records(vec![ReviewRecord {
            product_name: "Red Shoes".to_string(),
            overall_rating: "4.1".to_string(),
            price: "Rs. 1,299".to_string(),
            date: "2 Jan 2024".to_string(),
            rating: "4".to_string(),
            reviewer_name: "Ravi".to_string(),
            comment: "Comfortable, \"true\" to size\nwould buy again".to_string(),
        }])
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let key = DatasetKey::from_product_name("Red Shoes").unwrap();

        let path = store.write(&key, &sample()).await.unwrap();
        assert_eq!(path, dir.path().join("Red_Shoes.csv"));
        assert_eq!(store.read(&key).await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let key = DatasetKey::from_product_name("Red Shoes").unwrap();

        store.write(&key, &sample()).await.unwrap();
        store.write(&key, &Dataset::new()).await.unwrap();

        let read = store.read(&key).await.unwrap().unwrap();
        assert!(read.is_empty());
        assert!(read.has_schema());
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_key_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let key = DatasetKey::from_product_name("Red Shoes").unwrap();
        let bigger = Dataset::concat([sample(), sample()]);

        let small = sample();
        let (first, second) = tokio::join!(store.write(&key, &small), store.write(&key, &bigger));
        assert_eq!(first.unwrap(), second.unwrap());

        let read = store.read(&key).await.unwrap().unwrap();
        assert!(read == sample() || read == bigger);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("absent"));
        let key = DatasetKey::from_product_name("Blue Jeans").unwrap();

        assert_eq!(store.read(&key).await.unwrap(), None);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_lists_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        for name in ["Red Shoes", "Blue Jeans"] {
            let key = DatasetKey::from_product_name(name).unwrap();
            store.write(&key, &sample()).await.unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let keys: Vec<_> = store.keys().await.unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["Blue_Jeans", "Red_Shoes"]);
    }

    #[tokio::test]
    async fn test_foreign_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::write(dir.path().join("Odd.csv"), "a,b\n1,2\n").unwrap();

        let key = DatasetKey::from_product_name("Odd").unwrap();
        let err = store.read(&key).await.unwrap_err();
        assert!(matches!(err, ReviewError::LocalStore { .. }));
    }
}
