//! Suggestion feed repository
//!
//! Keeps one cache per catalog variant and turns them into a deduplicated,
//! dismissal-filtered, shuffled queue. Catalog failures never reach the caller as
//! errors from [`SuggestionFeedRepository::refresh_all_variants`]; they degrade the
//! feed down to the static fallback list instead.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Filter, FilterSet, PreferenceSet, SuggestionItem, MOVIES_CATEGORY},
    services::{
        catalog::{CatalogClient, CatalogVariant, DiscoverQuery},
        fallback::{default_movie_genres, fallback_movies},
    },
};

/// Where the items of a [`Feed`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    Live,
    /// Static data; the UI shows a "using offline data" banner
    Fallback,
}

/// A ready-to-display queue of suggestions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub items: Vec<SuggestionItem>,
    pub source: FeedSource,
}

impl Feed {
    pub fn is_offline(&self) -> bool {
        self.source == FeedSource::Fallback
    }
}

/// Something a fetch writes to; at most one request per resource runs at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FeedResource {
    Variant(CatalogVariant),
    Filtered,
}

impl Display for FeedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedResource::Variant(variant) => write!(f, "variant:{}", variant),
            FeedResource::Filtered => write!(f, "filtered"),
        }
    }
}

/// Held while a request for `resource` is running, released on drop
struct InFlightToken<'a> {
    registry: &'a Mutex<HashSet<FeedResource>>,
    resource: FeedResource,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.resource);
    }
}

#[derive(Debug, Clone, Default)]
struct VariantCache {
    items: Vec<SuggestionItem>,
    /// Last page loaded, 0 when nothing has been fetched
    page: u32,
    total_pages: u32,
}

pub struct SuggestionFeedRepository {
    catalog: Arc<dyn CatalogClient>,
    caches: RwLock<HashMap<CatalogVariant, VariantCache>>,
    /// Lowercase genre name → catalog id, filled on first successful lookup
    genre_ids: RwLock<Option<HashMap<String, u32>>>,
    in_flight: Mutex<HashSet<FeedResource>>,
    fallback: Vec<SuggestionItem>,
}

impl SuggestionFeedRepository {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self::with_fallback(catalog, fallback_movies())
    }

    pub fn with_fallback(catalog: Arc<dyn CatalogClient>, fallback: Vec<SuggestionItem>) -> Self {
        Self {
            catalog,
            caches: RwLock::new(HashMap::new()),
            genre_ids: RwLock::new(None),
            in_flight: Mutex::new(HashSet::new()),
            fallback,
        }
    }

    fn acquire(&self, resource: FeedResource) -> AppResult<InFlightToken<'_>> {
        let mut active = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !active.insert(resource) {
            tracing::debug!(resource = %resource, "Rejecting duplicate request");
            return Err(AppError::RequestInFlight(resource.to_string()));
        }

        Ok(InFlightToken {
            registry: &self.in_flight,
            resource,
        })
    }

    /// Fetches one page of a variant
    ///
    /// Page 1 replaces the variant's cache, later pages append to it. On failure
    /// the cache is left untouched and the error is returned.
    pub async fn refresh_category_variant(
        &self,
        variant: CatalogVariant,
        page: u32,
    ) -> AppResult<Vec<SuggestionItem>> {
        let _token = self.acquire(FeedResource::Variant(variant))?;

        let catalog_page = match self.catalog.fetch_by_category(variant, page).await {
            Ok(catalog_page) => catalog_page,
            Err(e) => {
                tracing::warn!(
                    variant = %variant,
                    page = page,
                    error = %e,
                    reason = e.kind(),
                    "Variant refresh failed"
                );
                return Err(e);
            }
        };

        let mut caches = self.caches.write().await;
        let cache = caches.entry(variant).or_default();
        if page <= 1 {
            cache.items = catalog_page.items.clone();
        } else {
            cache.items.extend(catalog_page.items.iter().cloned());
        }
        cache.page = page;
        cache.total_pages = catalog_page.total_pages;

        tracing::debug!(
            variant = %variant,
            page = page,
            cached = cache.items.len(),
            "Variant cache updated"
        );

        Ok(catalog_page.items)
    }

    /// Fetches the page after the last one loaded for `variant`
    ///
    /// Returns an empty list once the last page has been loaded.
    pub async fn load_next_page(&self, variant: CatalogVariant) -> AppResult<Vec<SuggestionItem>> {
        let (page, total_pages) = {
            let caches = self.caches.read().await;
            caches
                .get(&variant)
                .map(|c| (c.page, c.total_pages))
                .unwrap_or((0, 0))
        };

        if page > 0 && page >= total_pages {
            tracing::debug!(variant = %variant, page = page, "No more pages");
            return Ok(Vec::new());
        }

        self.refresh_category_variant(variant, page + 1).await
    }

    /// Fetches discovery results for the user's filters into the primary cache
    pub async fn fetch_filtered_for_user(
        &self,
        preferences: &PreferenceSet,
    ) -> AppResult<Vec<SuggestionItem>> {
        if preferences.category_id != MOVIES_CATEGORY {
            return Err(AppError::InvalidInput(format!(
                "No catalog for category {}",
                preferences.category_id
            )));
        }

        let _token = self.acquire(FeedResource::Filtered)?;
        let query = self.discover_query(&preferences.filters).await;

        let catalog_page = self.catalog.fetch_filtered(&query).await.map_err(|e| {
            tracing::warn!(error = %e, reason = e.kind(), "Filtered fetch failed");
            e
        })?;

        let mut caches = self.caches.write().await;
        caches.insert(
            CatalogVariant::Popular,
            VariantCache {
                items: catalog_page.items.clone(),
                page: catalog_page.page,
                total_pages: catalog_page.total_pages,
            },
        );

        tracing::info!(
            results = catalog_page.items.len(),
            "Primary cache replaced with filtered results"
        );

        Ok(catalog_page.items)
    }

    async fn discover_query(&self, filters: &FilterSet) -> DiscoverQuery {
        let mut query = DiscoverQuery::default();

        for filter in filters.iter() {
            match filter {
                Filter::Genres(names) => query.genre_ids = self.resolve_genre_ids(names).await,
                Filter::Languages(languages) => query.languages = languages.clone(),
                Filter::Rating(range) => {
                    query.min_rating = range.min;
                    query.max_rating = range.max;
                }
                Filter::Year(year) => query.year = Some(*year),
            }
        }

        query
    }

    async fn resolve_genre_ids(&self, names: &[String]) -> Vec<u32> {
        let taxonomy = self.genre_taxonomy().await;

        let ids: Vec<u32> = names
            .iter()
            .filter_map(|name| {
                let id = taxonomy.get(&name.trim().to_lowercase()).copied();
                if id.is_none() {
                    tracing::debug!(genre = %name, "Unknown genre name, skipping");
                }
                id
            })
            .collect();

        if ids.is_empty() && !names.is_empty() {
            tracing::warn!(
                genres = ?names,
                "No selected genre is known to the catalog, results are not genre-filtered"
            );
        }

        ids
    }

    async fn genre_taxonomy(&self) -> HashMap<String, u32> {
        if let Some(taxonomy) = self.genre_ids.read().await.as_ref() {
            return taxonomy.clone();
        }

        match self.catalog.fetch_genres().await {
            Ok(genres) if !genres.is_empty() => {
                let taxonomy: HashMap<String, u32> = genres
                    .into_iter()
                    .map(|g| (g.name.to_lowercase(), g.id))
                    .collect();
                *self.genre_ids.write().await = Some(taxonomy.clone());
                taxonomy
            }
            Ok(_) => {
                tracing::warn!("Empty genre taxonomy, using built-in genre ids");
                default_movie_genres()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reason = e.kind(),
                    "Genre lookup failed, using built-in genre ids"
                );
                default_movie_genres()
            }
        }
    }

    /// Merges all variant caches into a fresh queue
    ///
    /// May be empty; callers wanting a displayable feed use
    /// [`queue_from_cache`](Self::queue_from_cache).
    pub async fn build_fresh_queue(&self, dismissed: &HashSet<String>) -> Vec<SuggestionItem> {
        let merged: Vec<SuggestionItem> = {
            let caches = self.caches.read().await;
            CatalogVariant::ALL
                .iter()
                .filter_map(|variant| caches.get(variant))
                .flat_map(|cache| cache.items.iter().cloned())
                .collect()
        };

        fresh_order(merged, dismissed, &mut rand::thread_rng())
    }

    /// Queue from the current caches, falling back to static data when empty
    pub async fn queue_from_cache(&self, dismissed: &HashSet<String>) -> Feed {
        let items = self.build_fresh_queue(dismissed).await;
        if items.is_empty() {
            return self.fallback_feed(dismissed);
        }

        Feed {
            items,
            source: FeedSource::Live,
        }
    }

    /// Refreshes page 1 of every variant concurrently and builds a queue
    ///
    /// Never fails: if every variant hits a catalog error the static fallback list
    /// is returned. Variants skipped because a refresh for them is already running
    /// are not outages; they are served from whatever is cached.
    pub async fn refresh_all_variants(&self, dismissed: &HashSet<String>) -> AppResult<Feed> {
        let results = join_all(
            CatalogVariant::ALL
                .iter()
                .map(|variant| self.refresh_category_variant(*variant, 1)),
        )
        .await;

        let mut success_count = 0;
        let mut in_flight_count = 0;
        let mut error_count = 0;
        for result in &results {
            match result {
                Ok(_) => success_count += 1,
                Err(AppError::RequestInFlight(_)) => in_flight_count += 1,
                Err(_) => error_count += 1,
            }
        }

        if success_count == 0 && in_flight_count == 0 {
            tracing::warn!(
                error_count = error_count,
                "All variant refreshes failed, serving fallback data"
            );
            return Ok(self.fallback_feed(dismissed));
        }

        if in_flight_count > 0 {
            tracing::debug!(
                in_flight_count = in_flight_count,
                "Variant refresh already running, serving cached items"
            );
        }

        if error_count > 0 {
            tracing::warn!(
                success_count = success_count,
                error_count = error_count,
                "Partial variant refresh failure"
            );
        }

        Ok(self.queue_from_cache(dismissed).await)
    }

    /// Snapshot of one variant's cache
    pub async fn cached_items(&self, variant: CatalogVariant) -> Vec<SuggestionItem> {
        self.caches
            .read()
            .await
            .get(&variant)
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    fn fallback_feed(&self, dismissed: &HashSet<String>) -> Feed {
        let items = remove_dismissed(self.fallback.clone(), dismissed);
        tracing::info!(items = items.len(), "Using fallback suggestions");

        Feed {
            items,
            source: FeedSource::Fallback,
        }
    }
}

/// Keeps the first occurrence of each id, preserving order
pub fn dedup_by_id(items: Vec<SuggestionItem>) -> Vec<SuggestionItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

pub fn remove_dismissed(
    items: Vec<SuggestionItem>,
    dismissed: &HashSet<String>,
) -> Vec<SuggestionItem> {
    items
        .into_iter()
        .filter(|item| !dismissed.contains(&item.id))
        .collect()
}

/// Dedup, drop dismissed ids, then shuffle with `rng`
pub fn fresh_order(
    candidates: Vec<SuggestionItem>,
    dismissed: &HashSet<String>,
    rng: &mut impl Rng,
) -> Vec<SuggestionItem> {
    let mut queue = remove_dismissed(dedup_by_id(candidates), dismissed);
    queue.shuffle(rng);
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiGenre, RatingRange};
    use crate::services::catalog::{CatalogPage, MockCatalogClient};
    use chrono::Utc;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;

    fn item(id: &str) -> SuggestionItem {
        SuggestionItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: String::new(),
            image_url: None,
            category: MOVIES_CATEGORY.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn items(ids: &[&str]) -> Vec<SuggestionItem> {
        ids.iter().map(|id| item(id)).collect()
    }

    fn ids(items: &[SuggestionItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    fn id_set(items: &[SuggestionItem]) -> HashSet<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    fn dismissed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn page(ids: &[&str], page: u32, total_pages: u32) -> CatalogPage {
        CatalogPage {
            page,
            total_pages,
            total_results: ids.len() as u32,
            items: items(ids),
        }
    }

    fn variant_ids(variant: CatalogVariant) -> &'static [&'static str] {
        match variant {
            CatalogVariant::Popular => &["movie_1", "movie_2"],
            CatalogVariant::TopRated => &["movie_2", "movie_3"],
            CatalogVariant::NowPlaying => &["movie_4"],
        }
    }

    fn upstream_500() -> AppError {
        AppError::Upstream {
            status: 500,
            body: "Internal Server Error".to_string(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = item("movie_1");
        first.title = "first".to_string();
        let mut second = item("movie_1");
        second.title = "second".to_string();

        let deduped = dedup_by_id(vec![first, item("movie_2"), second]);
        assert_eq!(ids(&deduped), vec!["movie_1", "movie_2"]);
        assert_eq!(deduped[0].title, "first");
    }

    #[test]
    fn test_dedup_then_dismissal_scenario() {
        let candidates = items(&["movie_1", "movie_5", "movie_7", "movie_1"]);

        let deduped = dedup_by_id(candidates.clone());
        assert_eq!(ids(&deduped), vec!["movie_1", "movie_5", "movie_7"]);

        let filtered = remove_dismissed(deduped, &dismissed(&["movie_5"]));
        assert_eq!(ids(&filtered), vec!["movie_1", "movie_7"]);

        let queue = fresh_order(
            candidates,
            &dismissed(&["movie_5"]),
            &mut StdRng::seed_from_u64(7),
        );
        assert_eq!(id_set(&queue), dismissed(&["movie_1", "movie_7"]));
    }

    #[test]
    fn test_fresh_order_id_set_independent_of_shuffle() {
        let candidates = items(&[
            "movie_1", "movie_2", "movie_3", "movie_2", "movie_4", "movie_5", "movie_6",
        ]);
        let dismissed = dismissed(&["movie_3", "movie_9"]);
        let expected = dismissed_complement(&candidates, &dismissed);

        for seed in 0..20 {
            let queue = fresh_order(
                candidates.clone(),
                &dismissed,
                &mut StdRng::seed_from_u64(seed),
            );
            assert_eq!(queue.len(), expected.len());
            assert_eq!(id_set(&queue), expected);
        }
    }

    fn dismissed_complement(
        candidates: &[SuggestionItem],
        dismissed: &HashSet<String>,
    ) -> HashSet<String> {
        id_set(candidates).difference(dismissed).cloned().collect()
    }

    #[test]
    fn test_fresh_order_varies_between_calls() {
        let candidates = items(&[
            "movie_1", "movie_2", "movie_3", "movie_4", "movie_5", "movie_6", "movie_7",
            "movie_8",
        ]);
        let mut rng = StdRng::seed_from_u64(42);

        let orders: HashSet<Vec<String>> = (0..10)
            .map(|_| ids(&fresh_order(candidates.clone(), &HashSet::new(), &mut rng)))
            .collect();
        assert!(orders.len() > 1);
    }

    #[tokio::test]
    async fn test_refresh_all_merges_variants_without_duplicates() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .times(3)
            .returning(|variant, p| Ok(page(variant_ids(variant), p, 10)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let feed = repo.refresh_all_variants(&HashSet::new()).await.unwrap();

        assert_eq!(feed.source, FeedSource::Live);
        assert_eq!(feed.items.len(), 4);
        assert_eq!(
            id_set(&feed.items),
            dismissed(&["movie_1", "movie_2", "movie_3", "movie_4"])
        );
    }

    #[tokio::test]
    async fn test_refresh_all_excludes_dismissed() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .returning(|variant, p| Ok(page(variant_ids(variant), p, 10)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let feed = repo
            .refresh_all_variants(&dismissed(&["movie_2", "movie_4"]))
            .await
            .unwrap();

        assert_eq!(id_set(&feed.items), dismissed(&["movie_1", "movie_3"]));
    }

    #[tokio::test]
    async fn test_refresh_all_failures_return_fallback() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .times(3)
            .returning(|_, _| Err(upstream_500()));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let feed = repo.refresh_all_variants(&HashSet::new()).await.unwrap();

        assert!(feed.is_offline());
        assert_eq!(feed.items, fallback_movies());
        assert_eq!(feed.items.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_uses_successful_variants() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .returning(|variant, p| match variant {
                CatalogVariant::TopRated => Ok(page(&["movie_3"], p, 1)),
                _ => Err(AppError::Timeout("read timed out".to_string())),
            });

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let feed = repo.refresh_all_variants(&HashSet::new()).await.unwrap();

        assert_eq!(feed.source, FeedSource::Live);
        assert_eq!(ids(&feed.items), vec!["movie_3"]);
    }

    #[tokio::test]
    async fn test_empty_results_fall_back() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .returning(|_, p| Ok(page(&[], p, 1)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let feed = repo.refresh_all_variants(&HashSet::new()).await.unwrap();

        assert!(feed.is_offline());
        assert!(!feed.items.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_respects_dismissals() {
        let catalog = MockCatalogClient::new();
        let repo = SuggestionFeedRepository::with_fallback(
            Arc::new(catalog),
            items(&["movie_10", "movie_11"]),
        );

        let feed = repo.queue_from_cache(&dismissed(&["movie_10"])).await;
        assert!(feed.is_offline());
        assert_eq!(ids(&feed.items), vec!["movie_11"]);
    }

    #[tokio::test]
    async fn test_page_one_replaces_later_pages_append() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .returning(|_, p| match p {
                1 => Ok(page(&["movie_1", "movie_2"], 1, 3)),
                _ => Ok(page(&["movie_3"], p, 3)),
            });

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        repo.refresh_category_variant(CatalogVariant::Popular, 1)
            .await
            .unwrap();
        repo.refresh_category_variant(CatalogVariant::Popular, 2)
            .await
            .unwrap();
        assert_eq!(
            ids(&repo.cached_items(CatalogVariant::Popular).await),
            vec!["movie_1", "movie_2", "movie_3"]
        );

        repo.refresh_category_variant(CatalogVariant::Popular, 1)
            .await
            .unwrap();
        assert_eq!(
            ids(&repo.cached_items(CatalogVariant::Popular).await),
            vec!["movie_1", "movie_2"]
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let mut catalog = MockCatalogClient::new();
        let mut seq = mockall::Sequence::new();
        catalog
            .expect_fetch_by_category()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, p| Ok(page(&["movie_1"], p, 1)));
        catalog
            .expect_fetch_by_category()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AppError::NetworkUnavailable("offline".to_string())));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        repo.refresh_category_variant(CatalogVariant::NowPlaying, 1)
            .await
            .unwrap();

        let result = repo
            .refresh_category_variant(CatalogVariant::NowPlaying, 1)
            .await;
        assert!(matches!(result, Err(AppError::NetworkUnavailable(_))));
        assert_eq!(
            ids(&repo.cached_items(CatalogVariant::NowPlaying).await),
            vec!["movie_1"]
        );
    }

    #[tokio::test]
    async fn test_load_next_page_stops_at_last_page() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .times(2)
            .returning(|_, p| Ok(page(&[if p == 1 { "movie_1" } else { "movie_2" }], p, 2)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        assert_eq!(
            ids(&repo.load_next_page(CatalogVariant::TopRated).await.unwrap()),
            vec!["movie_1"]
        );
        assert_eq!(
            ids(&repo.load_next_page(CatalogVariant::TopRated).await.unwrap()),
            vec!["movie_2"]
        );
        assert!(repo
            .load_next_page(CatalogVariant::TopRated)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected_while_in_flight() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .times(1)
            .returning(|_, p| Ok(page(&["movie_1"], p, 1)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let token = repo
            .acquire(FeedResource::Variant(CatalogVariant::Popular))
            .unwrap();

        let result = repo
            .refresh_category_variant(CatalogVariant::Popular, 1)
            .await;
        assert!(matches!(result, Err(AppError::RequestInFlight(_))));

        drop(token);
        assert!(repo
            .refresh_category_variant(CatalogVariant::Popular, 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_filtered_fetch_maps_genres_and_replaces_primary_cache() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_fetch_genres().times(1).returning(|| {
            Ok(vec![
                ApiGenre {
                    id: 28,
                    name: "Action".to_string(),
                },
                ApiGenre {
                    id: 35,
                    name: "Comedy".to_string(),
                },
            ])
        });
        catalog
            .expect_fetch_filtered()
            .withf(|query| {
                query.genre_ids == vec![28, 35]
                    && query.languages == vec!["en".to_string()]
                    && query.min_rating == Some(7.0)
                    && query.year == Some(2010)
            })
            .times(2)
            .returning(|_| Ok(page(&["movie_20", "movie_21"], 1, 5)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let preferences = PreferenceSet {
            category_id: MOVIES_CATEGORY.to_string(),
            filters: FilterSet::new()
                .with(Filter::Genres(vec![
                    "Action".to_string(),
                    "comedy".to_string(),
                    "Space Opera".to_string(),
                ]))
                .with(Filter::Languages(vec!["en".to_string()]))
                .with(Filter::Rating(RatingRange {
                    min: Some(7.0),
                    max: None,
                }))
                .with(Filter::Year(2010)),
            last_updated: Utc::now(),
        };

        let results = repo.fetch_filtered_for_user(&preferences).await.unwrap();
        assert_eq!(ids(&results), vec!["movie_20", "movie_21"]);
        assert_eq!(
            ids(&repo.cached_items(CatalogVariant::Popular).await),
            vec!["movie_20", "movie_21"]
        );

        // taxonomy is looked up once
        repo.fetch_filtered_for_user(&preferences).await.unwrap();
    }

    #[tokio::test]
    async fn test_genre_lookup_failure_uses_builtin_ids() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_genres()
            .returning(|| Err(AppError::Timeout("slow".to_string())));
        catalog
            .expect_fetch_filtered()
            .withf(|query| query.genre_ids == vec![18])
            .returning(|_| Ok(page(&["movie_30"], 1, 1)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let preferences = PreferenceSet {
            category_id: MOVIES_CATEGORY.to_string(),
            filters: FilterSet::new().with(Filter::Genres(vec!["Drama".to_string()])),
            last_updated: Utc::now(),
        };

        let results = repo.fetch_filtered_for_user(&preferences).await.unwrap();
        assert_eq!(ids(&results), vec!["movie_30"]);
    }

    #[tokio::test]
    async fn test_filtered_fetch_failure_keeps_cache() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_by_category()
            .returning(|_, p| Ok(page(&["movie_1"], p, 1)));
        catalog
            .expect_fetch_filtered()
            .returning(|_| Err(AppError::MalformedResponse("truncated".to_string())));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        repo.refresh_category_variant(CatalogVariant::Popular, 1)
            .await
            .unwrap();

        let preferences = PreferenceSet {
            category_id: MOVIES_CATEGORY.to_string(),
            filters: FilterSet::new().with(Filter::Year(1999)),
            last_updated: Utc::now(),
        };
        assert!(repo.fetch_filtered_for_user(&preferences).await.is_err());
        assert_eq!(
            ids(&repo.cached_items(CatalogVariant::Popular).await),
            vec!["movie_1"]
        );
    }

    #[tokio::test]
    async fn test_filtered_fetch_rejects_unknown_category() {
        let catalog = MockCatalogClient::new();
        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let preferences = PreferenceSet {
            category_id: "restaurants".to_string(),
            filters: FilterSet::new(),
            last_updated: Utc::now(),
        };

        let result = repo.fetch_filtered_for_user(&preferences).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    /// Healthy catalog that takes a while to answer listing requests
    struct SlowCatalog {
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl CatalogClient for SlowCatalog {
        async fn fetch_by_category(
            &self,
            variant: CatalogVariant,
            p: u32,
        ) -> AppResult<CatalogPage> {
            tokio::time::sleep(self.delay).await;
            Ok(page(variant_ids(variant), p, 1))
        }

        async fn fetch_filtered(&self, query: &DiscoverQuery) -> AppResult<CatalogPage> {
            Ok(page(&[], query.page, 1))
        }

        async fn fetch_genres(&self) -> AppResult<Vec<ApiGenre>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_overlapping_refresh_serves_cache_not_fallback() {
        let repo = SuggestionFeedRepository::new(Arc::new(SlowCatalog {
            delay: std::time::Duration::from_millis(50),
        }));
        let none = HashSet::new();

        let warm = repo.refresh_all_variants(&none).await.unwrap();
        assert_eq!(warm.source, FeedSource::Live);

        let (first, second) = tokio::join!(
            repo.refresh_all_variants(&none),
            repo.refresh_all_variants(&none)
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let expected = dismissed(&["movie_1", "movie_2", "movie_3", "movie_4"]);
        assert!(!first.is_offline());
        assert!(!second.is_offline());
        assert_eq!(id_set(&first.items), expected);
        assert_eq!(id_set(&second.items), expected);
    }

    #[tokio::test]
    async fn test_unknown_genres_leave_query_unfiltered() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_fetch_genres().returning(|| {
            Ok(vec![ApiGenre {
                id: 28,
                name: "Action".to_string(),
            }])
        });
        catalog
            .expect_fetch_filtered()
            .withf(|query| query.genre_ids.is_empty() && query.year == Some(2005))
            .times(1)
            .returning(|_| Ok(page(&["movie_40"], 1, 1)));

        let repo = SuggestionFeedRepository::new(Arc::new(catalog));
        let preferences = PreferenceSet {
            category_id: MOVIES_CATEGORY.to_string(),
            filters: FilterSet::new()
                .with(Filter::Genres(vec!["Space Opera".to_string()]))
                .with(Filter::Year(2005)),
            last_updated: Utc::now(),
        };

        let results = repo.fetch_filtered_for_user(&preferences).await.unwrap();
        assert_eq!(ids(&results), vec!["movie_40"]);
    }
}
