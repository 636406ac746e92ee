//! Key-value store trait and implementations

use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Named store partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Handles,
    Preferences,
    DeviceSelections,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Handles => "handles",
            Partition::Preferences => "preferences",
            Partition::DeviceSelections => "deviceSelections",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous JSON key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, partition: Partition, key: &str) -> AppResult<Option<Value>>;

    async fn set(&self, partition: Partition, key: &str, value: Value) -> AppResult<()>;

    async fn delete(&self, partition: Partition, key: &str) -> AppResult<()>;
}

/// Read and decode a value. Failures are logged and read as absent.
pub async fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, partition: Partition, key: &str) -> Option<T> {
    match store.get(partition, key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}/{}: {}", partition, key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Failed to read {}/{}: {}", partition, key, e);
            None
        }
    }
}

/// Encode and write a value. Failures propagate.
pub async fn save<T: Serialize>(
    store: &dyn KeyValueStore,
    partition: Partition,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let value = serde_json::to_value(value)?;
    store.set(partition, key, value).await
}

/// Volatile store, used when no data directory is configured
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(Partition, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, partition: Partition, key: &str) -> AppResult<Option<Value>> {
        Ok(self.entries.lock().get(&(partition, key.to_string())).cloned())
    }

    async fn set(&self, partition: Partition, key: &str, value: Value) -> AppResult<()> {
        self.entries.lock().insert((partition, key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> AppResult<()> {
        self.entries.lock().remove(&(partition, key.to_string()));
        Ok(())
    }
}

/// One JSON object file per partition inside a directory
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the partition files.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn partition_path(&self, partition: Partition) -> PathBuf {
        self.dir.join(format!("{}.json", partition.as_str()))
    }

    async fn read_partition(&self, partition: Partition) -> AppResult<Map<String, Value>> {
        let path = self.partition_path(partition);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::PersistenceFailed(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
        }
    }

    async fn write_partition(&self, partition: Partition, map: Map<String, Value>) -> AppResult<()> {
        let path = self.partition_path(partition);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&Value::Object(map))?;

        let result = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&tmp_path, content).await?;
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        result.map_err(|e| AppError::PersistenceFailed(format!("writing {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, partition: Partition, key: &str) -> AppResult<Option<Value>> {
        let mut map = self.read_partition(partition).await?;
        Ok(map.remove(key))
    }

    async fn set(&self, partition: Partition, key: &str, value: Value) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        // A corrupt partition must not block new writes.
        let mut map = self.read_partition(partition).await.unwrap_or_else(|e| {
            tracing::warn!("Resetting unreadable partition {}: {}", partition, e);
            Map::new()
        });
        map.insert(key.to_string(), value);
        self.write_partition(partition, map).await?;
        tracing::debug!("Stored {}/{}", partition, key);
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_partition(partition).await?;
        if map.remove(key).is_some() {
            self.write_partition(partition, map).await?;
        }
        Ok(())
    }
}
