//! Key-value storage areas holding JSON values.

use async_trait::async_trait;
use marktab_core::{MarkTabError, MarkTabResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// A host key-value area such as the session or sync storage.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Read one key. Missing keys yield `None`.
    async fn get(&self, key: &str) -> MarkTabResult<Option<Value>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> MarkTabResult<()>;

    async fn remove(&self, key: &str) -> MarkTabResult<()>;
}

/// Area handle shared by the components of one background instance.
pub type SharedArea = Arc<dyn StorageArea>;

/// Area living in process memory, cleared when the process exits.
#[derive(Debug, Default)]
pub struct MemoryArea {
    values: Mutex<Map<String, Value>>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored.
    pub async fn snapshot(&self) -> Map<String, Value> {
        self.values.lock().await.clone()
    }
}

#[async_trait]
impl StorageArea for MemoryArea {
    async fn get(&self, key: &str) -> MarkTabResult<Option<Value>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> MarkTabResult<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> MarkTabResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// Area stored as a single JSON object in a file.
///
/// A missing file reads as an empty area; it is created on first write.
#[derive(Debug)]
pub struct JsonFileArea {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileArea {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> MarkTabResult<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Storage file missing, starting empty");
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(MarkTabError::storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> MarkTabResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!(path = %self.path.display(), keys = document.len(), "Storage file written");
        Ok(())
    }
}

#[async_trait]
impl StorageArea for JsonFileArea {
    async fn get(&self, key: &str) -> MarkTabResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> MarkTabResult<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value);
        self.write_document(&document).await
    }

    async fn remove(&self, key: &str) -> MarkTabResult<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        if document.remove(key).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }
}
