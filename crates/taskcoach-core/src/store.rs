//! Durable store implementations.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::traits::DurableStore;

/// Stores each key as a pretty-printed `<key>.json` file in a directory.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document stored under `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Unavailable {
                    key: key.to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        let unavailable = |source: std::io::Error| StoreError::Unavailable {
            key: key.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(unavailable)?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, json).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &path).await.map_err(unavailable)?;

        tracing::debug!(path = %path.display(), "store document written");
        Ok(())
    }
}

/// Process-local store, mainly for tests.
///
/// Saves can be made to fail on demand to exercise write-failure handling.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<String, Value>>,
    fail_saves: AtomicBool,
    save_count: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if a previous process had saved it.
    pub fn with_document(key: &str, value: Value) -> Self {
        let store = Self::default();
        store
            .documents
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
        store
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Current document under `key`, if any.
    pub fn document(&self, key: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.document(key))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                key: key.to_string(),
                source: std::io::Error::new(ErrorKind::Other, "save disabled"),
            });
        }
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
