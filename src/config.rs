use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Catalog API key, sent as the `api_key` query parameter
    pub catalog_api_key: String,

    /// Catalog API base URL
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Base URL poster paths are joined onto
    #[serde(default = "default_catalog_image_url")]
    pub catalog_image_url: String,

    /// Language requested for titles and overviews
    #[serde(default = "default_catalog_language")]
    pub catalog_language: String,

    #[serde(default = "default_timeout_secs")]
    pub http_connect_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub http_read_timeout_secs: u64,

    /// Which key-value backend holds dismissals and preferences
    #[serde(default)]
    pub storage_backend: StorageBackend,

    /// Directory for the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Redis connection URL for the redis backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Redis,
    Memory,
}

fn default_catalog_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_catalog_image_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_catalog_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".suggestion-feed")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
