pub mod catalog;
pub mod fallback;
pub mod feed;

pub use catalog::{CatalogClient, CatalogVariant, TmdbClient};
pub use feed::{Feed, FeedSource, SuggestionFeedRepository};
