//! Third-party content catalog abstraction
//!
//! The feed repository only talks to a [`CatalogClient`]; the HTTP implementation
//! lives in [`tmdb`]. Implementations never panic across this boundary, every
//! failure comes back as an [`AppError`](crate::error::AppError) carrying its reason.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{
    error::AppResult,
    models::{ApiGenre, SuggestionItem},
};

pub mod tmdb;

pub use tmdb::TmdbClient;

/// Upstream listing merged into the movie feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVariant {
    Popular,
    TopRated,
    NowPlaying,
}

impl CatalogVariant {
    /// Merge order of the variant caches
    pub const ALL: [CatalogVariant; 3] = [
        CatalogVariant::Popular,
        CatalogVariant::TopRated,
        CatalogVariant::NowPlaying,
    ];

    /// Listing endpoint relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            CatalogVariant::Popular => "movie/popular",
            CatalogVariant::TopRated => "movie/top_rated",
            CatalogVariant::NowPlaying => "movie/now_playing",
        }
    }
}

impl Display for CatalogVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogVariant::Popular => write!(f, "popular"),
            CatalogVariant::TopRated => write!(f, "top_rated"),
            CatalogVariant::NowPlaying => write!(f, "now_playing"),
        }
    }
}

/// One page of converted results
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub items: Vec<SuggestionItem>,
}

/// Parameters for the discovery endpoint, already in catalog terms
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub genre_ids: Vec<u32>,
    /// Only the first entry is sent; the endpoint accepts a single language
    pub languages: Vec<String>,
    pub min_rating: Option<f32>,
    pub max_rating: Option<f32>,
    pub year: Option<u16>,
    pub page: u32,
}

impl Default for DiscoverQuery {
    fn default() -> Self {
        Self {
            genre_ids: Vec::new(),
            languages: Vec::new(),
            min_rating: None,
            max_rating: None,
            year: None,
            page: 1,
        }
    }
}

impl DiscoverQuery {
    /// Query parameters for the discovery endpoint, excluding auth and paging
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if !self.genre_ids.is_empty() {
            let ids: Vec<String> = self.genre_ids.iter().map(u32::to_string).collect();
            params.push(("with_genres", ids.join(",")));
        }

        if let Some(language) = self.languages.first() {
            if self.languages.len() > 1 {
                tracing::debug!(
                    requested = self.languages.len(),
                    used = %language,
                    "Catalog accepts one language, ignoring the rest"
                );
            }
            params.push(("with_original_language", language.clone()));
        }

        if let Some(min) = self.min_rating {
            params.push(("vote_average.gte", min.to_string()));
        }
        if let Some(max) = self.max_rating {
            params.push(("vote_average.lte", max.to_string()));
        }
        if let Some(year) = self.year {
            params.push(("primary_release_year", year.to_string()));
        }

        params
    }
}

/// Trait for content catalog clients
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page of a listing; `page` starts at 1
    async fn fetch_by_category(&self, variant: CatalogVariant, page: u32)
        -> AppResult<CatalogPage>;

    /// Fetch one page of the discovery endpoint
    async fn fetch_filtered(&self, query: &DiscoverQuery) -> AppResult<CatalogPage>;

    /// Genre taxonomy (id and display name)
    async fn fetch_genres(&self) -> AppResult<Vec<ApiGenre>>;
}
