use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Value too large: {size} bytes (limit {limit})")]
    ValueTooLarge { size: usize, limit: usize },
}

/// Options attached to a single `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Entry disappears once this much time has passed.
    pub expiration_ttl: Option<Duration>,
    pub metadata: Option<Value>,
}

/// Key-value store holding serialized documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
    metadata: Option<Value>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process [`DocumentStore`] honoring TTLs.
#[derive(Default)]
pub struct MemoryDocumentStore {
    entries: RwLock<HashMap<String, StoredValue>>,
    max_value_bytes: Option<usize>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values larger than `limit` bytes, like a hosted KV namespace would.
    pub fn with_max_value_bytes(limit: usize) -> Self {
        Self {
            entries: RwLock::default(),
            max_value_bytes: Some(limit),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|v| !v.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Metadata attached to a live entry.
    pub async fn metadata(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|v| !v.is_expired(now))
            .and_then(|v| v.metadata.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        if let Some(limit) = self.max_value_bytes {
            if value.len() > limit {
                return Err(StoreError::ValueTooLarge {
                    size: value.len(),
                    limit,
                });
            }
        }

        let expires_at = options.expiration_ttl.map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at,
                metadata: options.metadata,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired — purge it unless it was rewritten in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryDocumentStore::new();
        store
            .put("a", "1".to_string(), PutOptions::default())
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.len().await, 1);

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn keeps_metadata() {
        let store = MemoryDocumentStore::new();
        let options = PutOptions {
            expiration_ttl: None,
            metadata: Some(serde_json::json!({"source": "upload"})),
        };
        store.put("a", "1".to_string(), options).await.unwrap();
        assert_eq!(store.metadata("a").await.unwrap()["source"], "upload");
        assert_eq!(store.metadata("b").await, None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryDocumentStore::new();
        let options = PutOptions {
            expiration_ttl: Some(Duration::from_millis(20)),
            metadata: None,
        };
        store.put("a", "1".to_string(), options).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn rejects_oversized_values() {
        let store = MemoryDocumentStore::with_max_value_bytes(4);
        let err = store
            .put("a", "12345".to_string(), PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ValueTooLarge { size: 5, limit: 4 }));
    }
}
