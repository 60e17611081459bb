use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod preferences;

pub use preferences::{Filter, FilterSet, PreferenceSet, RatingRange, UserProfile};

/// Category id for movie suggestions, the only category backed by a catalog today
pub const MOVIES_CATEGORY: &str = "movies";

/// One suggestion shown to the user as a card
///
/// Identity is `id`, namespaced by source (e.g. "movie_550").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    /// Source-specific facts such as rating or release date
    pub metadata: BTreeMap<String, String>,
}

impl SuggestionItem {
    pub fn movie_id(catalog_id: u64) -> String {
        format!("movie_{}", catalog_id)
    }
}

/// A suggestion the user accepted and kept
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedChoice {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub saved_at: DateTime<Utc>,
}

impl SavedChoice {
    pub fn from_item(item: &SuggestionItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            category: item.category.clone(),
            saved_at: Utc::now(),
        }
    }
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// Raw paginated listing from the catalog API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMoviePage {
    pub page: u32,
    pub results: Vec<ApiMovie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Raw movie entry inside a listing
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl ApiMovie {
    /// Converts into a suggestion, joining the poster path onto `image_base_url`
    pub fn into_suggestion(self, image_base_url: &str) -> SuggestionItem {
        let mut metadata = BTreeMap::new();
        metadata.insert("rating".to_string(), format!("{:.1}", self.vote_average));
        metadata.insert("vote_count".to_string(), self.vote_count.to_string());
        if let Some(date) = self.release_date.filter(|d| !d.is_empty()) {
            metadata.insert("release_date".to_string(), date);
        }
        if let Some(language) = self.original_language {
            metadata.insert("original_language".to_string(), language);
        }
        if !self.genre_ids.is_empty() {
            let ids: Vec<String> = self.genre_ids.iter().map(u32::to_string).collect();
            metadata.insert("genre_ids".to_string(), ids.join(","));
        }

        let image_url = self
            .poster_path
            .filter(|p| !p.is_empty())
            .map(|path| format!("{}{}", image_base_url.trim_end_matches('/'), path));

        SuggestionItem {
            id: SuggestionItem::movie_id(self.id),
            title: self.title,
            description: self.overview,
            image_url,
            category: MOVIES_CATEGORY.to_string(),
            metadata,
        }
    }
}

/// Genre taxonomy response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenreList {
    pub genres: Vec<ApiGenre>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiGenre {
    pub id: u32,
    pub name: String,
}
