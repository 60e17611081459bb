use std::sync::Arc;

use crate::models::{SavedChoice, SuggestionItem, MOVIES_CATEGORY};
use crate::services::{Feed, SuggestionFeedRepository};
use crate::stores::{DismissalStore, PreferenceStore, SavedChoiceStore};

/// Components shared by everything that drives the feed
///
/// Built once at start-up and passed explicitly to whoever needs it.
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<SuggestionFeedRepository>,
    pub dismissals: Arc<DismissalStore>,
    pub preferences: Arc<PreferenceStore>,
    pub saved: Arc<SavedChoiceStore>,
}

impl AppState {
    pub fn new(
        feed: Arc<SuggestionFeedRepository>,
        dismissals: Arc<DismissalStore>,
        preferences: Arc<PreferenceStore>,
        saved: Arc<SavedChoiceStore>,
    ) -> Self {
        Self {
            feed,
            dismissals,
            preferences,
            saved,
        }
    }

    /// Refreshes every catalog variant and returns a fresh queue
    pub async fn next_feed(&self) -> Feed {
        let dismissed = self.dismissals.snapshot().await;
        match self.feed.refresh_all_variants(&dismissed).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = %e, reason = e.kind(), "Feed refresh failed");
                self.feed.queue_from_cache(&dismissed).await
            }
        }
    }

    /// Queue from whatever is already cached, without touching the network
    pub async fn current_feed(&self) -> Feed {
        let dismissed = self.dismissals.snapshot().await;
        self.feed.queue_from_cache(&dismissed).await
    }

    /// Fetches suggestions matching the selected category's filters
    ///
    /// Without stored filters this is a plain refresh. A failed filtered fetch
    /// degrades to the cached or fallback queue.
    pub async fn apply_preferences(&self) -> Feed {
        let profile = self.preferences.get_current_profile().await;
        let category = profile
            .selected_category
            .as_deref()
            .unwrap_or(MOVIES_CATEGORY);

        let Some(preferences) = profile.filters_by_category.get(category) else {
            return self.next_feed().await;
        };

        if let Err(e) = self.feed.fetch_filtered_for_user(preferences).await {
            tracing::warn!(
                category = %category,
                error = %e,
                reason = e.kind(),
                "Filtered fetch failed, using cached suggestions"
            );
        }

        self.current_feed().await
    }

    /// Declines a suggestion so it never shows up again
    pub async fn decline(&self, id: &str) -> bool {
        let added = self.dismissals.add(id).await;
        tracing::info!(id = %id, added = added, "Suggestion declined");
        added
    }

    pub async fn undo_decline(&self, id: &str) -> bool {
        self.dismissals.remove(id).await
    }

    /// Keeps a suggestion and removes it from future feeds
    pub async fn save(&self, item: &SuggestionItem) -> bool {
        let added = self.saved.add(SavedChoice::from_item(item)).await;
        self.dismissals.add(&item.id).await;
        tracing::info!(id = %item.id, added = added, "Suggestion saved");
        added
    }
}
