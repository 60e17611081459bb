use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::KeyValueStore;
use crate::models::{Filter, FilterSet, PreferenceSet, UserProfile};

const SELECTED_CATEGORY_KEY: &str = "selected_category";
const CATEGORY_FILTERS_KEY: &str = "category_filters";
/// Written by older builds; never read, only cleaned up on reset
const LEGACY_ONBOARDING_KEY: &str = "onboarding_completed";

/// Durable selected category and per-category filters
///
/// Malformed or unreadable data loads as the default profile. Saves overwrite a
/// category's filters wholesale; merging happens on the in-memory copy first.
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStore>,
    profile: RwLock<UserProfile>,
}

impl PreferenceStore {
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let selected_category = read_json::<String>(storage.as_ref(), SELECTED_CATEGORY_KEY).await;
        let filters_by_category =
            read_json::<BTreeMap<String, PreferenceSet>>(storage.as_ref(), CATEGORY_FILTERS_KEY)
                .await
                .unwrap_or_default();

        tracing::info!(
            namespace = %storage.namespace(),
            selected_category = ?selected_category,
            categories = filters_by_category.len(),
            "Loaded preferences"
        );

        Self {
            storage,
            profile: RwLock::new(UserProfile {
                selected_category,
                filters_by_category,
            }),
        }
    }

    pub async fn set_selected_category(&self, category: &str) {
        let mut profile = self.profile.write().await;
        profile.selected_category = Some(category.to_string());
        self.write_json(SELECTED_CATEGORY_KEY, &profile.selected_category)
            .await;
    }

    /// Replaces all filters stored for `category_id`
    pub async fn set_filters(&self, category_id: &str, filters: FilterSet) {
        let mut profile = self.profile.write().await;
        self.replace_filters(&mut profile, category_id, filters).await;
    }

    /// Merges one filter into the category's current filters, then saves the category
    pub async fn update_filter(&self, category_id: &str, filter: Filter) {
        let mut profile = self.profile.write().await;
        let mut filters = profile
            .filters_for(category_id)
            .cloned()
            .unwrap_or_default();
        filters.insert(filter);
        self.replace_filters(&mut profile, category_id, filters).await;
    }

    pub async fn get_current_profile(&self) -> UserProfile {
        self.profile.read().await.clone()
    }

    /// Onboarding is shown on every launch
    pub fn onboarding_completed(&self) -> bool {
        false
    }

    pub async fn reset(&self) {
        let mut profile = self.profile.write().await;
        *profile = UserProfile::default();

        for key in [
            SELECTED_CATEGORY_KEY,
            CATEGORY_FILTERS_KEY,
            LEGACY_ONBOARDING_KEY,
        ] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::error!(error = %e, key = %key, "Failed to clear preference");
            }
        }
    }

    async fn replace_filters(
        &self,
        profile: &mut UserProfile,
        category_id: &str,
        filters: FilterSet,
    ) {
        profile.filters_by_category.insert(
            category_id.to_string(),
            PreferenceSet {
                category_id: category_id.to_string(),
                filters,
                last_updated: Utc::now(),
            },
        );
        self.write_json(CATEGORY_FILTERS_KEY, &profile.filters_by_category)
            .await;
    }

    async fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Preference serialization error");
                return;
            }
        };

        if let Err(e) = self.storage.set(key, json).await {
            tracing::error!(error = %e, reason = e.kind(), key = %key, "Failed to save preference");
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    storage: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    match storage.get(key).await {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Malformed preference, using default");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, reason = e.kind(), key = %key, "Failed to read preference");
            None
        }
    }
}
