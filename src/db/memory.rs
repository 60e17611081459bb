use std::collections::HashMap;

use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::AppResult;
#[cfg(test)]
use crate::error::AppError;

/// Non-durable store for tests and throwaway sessions
pub struct MemoryStore {
    namespace: String,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Backend whose every read and write fails
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Err(AppError::StorageRead(format!("{} unreadable", key)))
    }

    async fn set(&self, key: &str, _value: String) -> AppResult<()> {
        Err(AppError::StorageWrite(format!("{} read-only", key)))
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        Err(AppError::StorageWrite(format!("{} read-only", key)))
    }

    fn namespace(&self) -> &str {
        "failing"
    }
}
