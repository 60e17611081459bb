use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::KeyValueStore;

const IDS_KEY: &str = "dismissed_ids";
const COUNT_KEY: &str = "dismissed_count";

/// Durable set of suggestion ids the user rejected
///
/// The in-memory set is authoritative. Every mutation is written through to the
/// backing store before the call returns; write failures are logged and the
/// in-memory state is kept.
pub struct DismissalStore {
    storage: Arc<dyn KeyValueStore>,
    ids: RwLock<BTreeSet<String>>,
}

impl DismissalStore {
    /// Loads the persisted set, treating missing or corrupt data as empty
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let ids = match storage.get(IDS_KEY).await {
            Ok(Some(blob)) => decode_ids(&blob),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    reason = e.kind(),
                    namespace = %storage.namespace(),
                    "Failed to load dismissals"
                );
                BTreeSet::new()
            }
        };

        tracing::info!(
            count = ids.len(),
            namespace = %storage.namespace(),
            "Loaded dismissed ids"
        );

        Self {
            storage,
            ids: RwLock::new(ids),
        }
    }

    /// Returns `true` if the id was not already dismissed
    pub async fn add(&self, id: &str) -> bool {
        let mut ids = self.ids.write().await;
        if !ids.insert(id.to_string()) {
            return false;
        }
        self.persist(&ids).await;
        true
    }

    /// Returns whether the id was present
    pub async fn remove(&self, id: &str) -> bool {
        let mut ids = self.ids.write().await;
        if !ids.remove(id) {
            return false;
        }
        self.persist(&ids).await;
        true
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.contains(id)
    }

    /// Keeps the ids that are not dismissed, in input order
    pub async fn filter_out(&self, ids: &[String]) -> Vec<String> {
        let dismissed = self.ids.read().await;
        ids.iter()
            .filter(|id| !dismissed.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        let mut ids = self.ids.write().await;
        ids.clear();
        self.persist(&ids).await;
    }

    pub async fn snapshot(&self) -> HashSet<String> {
        self.ids.read().await.iter().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.ids.read().await.len()
    }

    async fn persist(&self, ids: &BTreeSet<String>) {
        let blob = encode_ids(ids);
        if let Err(e) = self.storage.set(IDS_KEY, blob).await {
            tracing::error!(
                error = %e,
                reason = e.kind(),
                namespace = %self.storage.namespace(),
                "Failed to persist dismissed ids"
            );
            return;
        }
        if let Err(e) = self.storage.set(COUNT_KEY, ids.len().to_string()).await {
            tracing::warn!(error = %e, "Failed to persist dismissed count");
        }
    }
}

/// Bracketed, comma-separated list of quoted ids: `["movie_1","movie_5"]`
fn encode_ids(ids: &BTreeSet<String>) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn decode_ids(blob: &str) -> BTreeSet<String> {
    match serde_json::from_str::<Vec<String>>(blob) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Corrupt dismissed ids, starting empty");
            BTreeSet::new()
        }
    }
}
