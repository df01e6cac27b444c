use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::blob::sanitize_filename;
use crate::error::StoreError;

/// Description of a store backend, reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub backend: &'static str,
    pub persistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Key-value operations every store backend implements.
///
/// Values are whole JSON documents: `set` replaces the previous value
/// entirely and a concurrent reader sees either the old or the new value.
/// There is no locking across calls, so read-modify-write cycles from two
/// callers can lose an update.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Removes a key. Returns `true` if a value was present.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn info(&self) -> Result<StoreInfo, StoreError>;
}

/// Result of a set/get/del round trip against a store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub key: String,
    pub written: Value,
    pub read_back: Option<Value>,
    pub values_match: bool,
}

/// Writes a throw-away key, reads it back and deletes it.
pub async fn probe(store: &dyn KvStore) -> Result<ProbeReport, StoreError> {
    let key = format!("kv-probe-{}", Uuid::new_v4());
    let written = serde_json::json!({
        "test": "connection",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    store.set(&key, &written).await?;
    let read_back = store.get(&key).await;
    // Clean up even when the read failed.
    let deleted = store.del(&key).await;
    let read_back = read_back?;
    deleted?;

    let values_match = read_back.as_ref() == Some(&written);
    Ok(ProbeReport {
        key,
        written,
        read_back,
        values_match,
    })
}

// ─── In-Memory Backend ─────────────────────────────────────────────

/// Process-lifetime store. Everything is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(StoreInfo {
            backend: "memory",
            persistent: false,
            keys: Some(keys),
            warning: Some(
                "in-memory store: data does not survive a process restart".to_string(),
            ),
        })
    }
}

// ─── Local File Backend ────────────────────────────────────────────

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", sanitize_filename(key)))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.key_path(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Hand the raw text back; the caller decides how to recover.
                tracing::warn!(path = %path.display(), "stored value is not valid JSON: {e}");
                Ok(Some(Value::String(raw)))
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.key_path(key);
        let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4()));
        let data = serde_json::to_vec_pretty(value)?;

        fs::write(&tmp, &data).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, StoreError> {
        let mut keys = Vec::new();
        if self.base_path.exists() {
            let mut entries = fs::read_dir(&self.base_path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        keys.push(stem.to_string());
                    }
                }
            }
        }
        keys.sort();

        Ok(StoreInfo {
            backend: "file",
            persistent: true,
            keys: Some(keys),
            warning: None,
        })
    }
}
