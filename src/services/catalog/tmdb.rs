//! TMDb-style catalog API client
//!
//! API Flow:
//! 1. Listings: /movie/{popular,top_rated,now_playing} → paginated movie results
//! 2. Discovery: /discover/movie with genre, language, rating and year filters
//! 3. Taxonomy: /genre/movie/list → genre id ↔ name
//!
//! Every request carries the API key as the `api_key` query parameter.

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{ApiGenre, ApiGenreList, ApiMoviePage},
    services::catalog::{CatalogClient, CatalogPage, CatalogVariant, DiscoverQuery},
};

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    language: String,
}

impl TmdbClient {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        image_url: String,
        language: String,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_url,
            language,
        }
    }

    /// Builds a client with the configured connect/read timeouts
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let connect_timeout = Duration::from_secs(config.http_connect_timeout_secs);
        let read_timeout = Duration::from_secs(config.http_read_timeout_secs);

        let http_client = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new(
            http_client,
            config.catalog_api_key.clone(),
            config.catalog_api_url.clone(),
            config.catalog_image_url.clone(),
            config.catalog_language.clone(),
        ))
    }

    /// GETs `path` and decodes the JSON body
    ///
    /// Non-2xx responses become `Upstream`, empty or undecodable bodies become
    /// `MalformedResponse`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path = %path, status = %status, "Catalog API request failed");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        if response_text.trim().is_empty() {
            return Err(AppError::MalformedResponse(format!(
                "Empty body from {}",
                path
            )));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                "Failed to deserialize catalog response"
            );
            AppError::MalformedResponse(format!("Failed to parse catalog response: {}", e))
        })
    }

    fn convert_page(&self, page: ApiMoviePage) -> CatalogPage {
        CatalogPage {
            page: page.page,
            total_pages: page.total_pages,
            total_results: page.total_results,
            items: page
                .results
                .into_iter()
                .map(|movie| movie.into_suggestion(&self.image_url))
                .collect(),
        }
    }
}

fn validate_page(page: u32) -> AppResult<()> {
    if page == 0 {
        return Err(AppError::InvalidInput(
            "Page numbers start at 1".to_string(),
        ));
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn fetch_by_category(
        &self,
        variant: CatalogVariant,
        page: u32,
    ) -> AppResult<CatalogPage> {
        validate_page(page)?;

        let raw: ApiMoviePage = self
            .get_json(variant.path(), &[("page", page.to_string())])
            .await?;
        let catalog_page = self.convert_page(raw);

        tracing::info!(
            variant = %variant,
            page = page,
            results = catalog_page.items.len(),
            "Catalog listing fetched"
        );

        Ok(catalog_page)
    }

    async fn fetch_filtered(&self, query: &DiscoverQuery) -> AppResult<CatalogPage> {
        validate_page(query.page)?;

        let mut params = query.to_params();
        params.push(("page", query.page.to_string()));
        params.push(("sort_by", "popularity.desc".to_string()));

        let raw: ApiMoviePage = self.get_json("discover/movie", &params).await?;
        let catalog_page = self.convert_page(raw);

        tracing::info!(
            page = query.page,
            genres = query.genre_ids.len(),
            results = catalog_page.items.len(),
            "Catalog discovery fetched"
        );

        Ok(catalog_page)
    }

    async fn fetch_genres(&self) -> AppResult<Vec<ApiGenre>> {
        let list: ApiGenreList = self.get_json("genre/movie/list", &[]).await?;
        tracing::debug!(genres = list.genres.len(), "Genre taxonomy fetched");
        Ok(list.genres)
    }
}
