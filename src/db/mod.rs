//! Durable key-value storage backing the dismissal and preference stores
//!
//! Each store owns one namespace; keys never collide across namespaces.

use crate::error::AppResult;

pub mod file;
pub mod memory;
pub mod redis;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(test)]
pub(crate) use memory::FailingStore;
pub use self::redis::{create_redis_client, RedisStore};

/// Namespace holding the dismissed-id set
pub const DISMISSALS_NAMESPACE: &str = "dismissals";
/// Namespace holding the selected category and per-category filters
pub const PREFERENCES_NAMESPACE: &str = "preferences";

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Identifies the store in logs
    fn namespace(&self) -> &str;
}
