use std::collections::{BTreeMap, HashMap};

use crate::models::{SuggestionItem, MOVIES_CATEGORY};

/// Suggestions served when no catalog data is available
pub fn fallback_movies() -> Vec<SuggestionItem> {
    vec![
        movie(
            278,
            "The Shawshank Redemption",
            "Imprisoned in the 1940s for the double murder of his wife and her lover, \
             upstanding banker Andy Dufresne begins a new life at the Shawshank prison.",
            "/9cqNxx0GxF0bflZmeSMuL5tnGzr.jpg",
            "8.7",
            "1994-09-23",
        ),
        movie(
            238,
            "The Godfather",
            "Spanning the years 1945 to 1955, a chronicle of the fictional Italian-American \
             Corleone crime family.",
            "/3bhkrj58Vtu7enYsRolD1fZdja1.jpg",
            "8.7",
            "1972-03-14",
        ),
    ]
}

fn movie(
    id: u64,
    title: &str,
    overview: &str,
    poster: &str,
    rating: &str,
    release_date: &str,
) -> SuggestionItem {
    let mut metadata = BTreeMap::new();
    metadata.insert("rating".to_string(), rating.to_string());
    metadata.insert("release_date".to_string(), release_date.to_string());
    metadata.insert("source".to_string(), "fallback".to_string());

    SuggestionItem {
        id: SuggestionItem::movie_id(id),
        title: title.to_string(),
        description: overview.to_string(),
        image_url: Some(format!("https://image.tmdb.org/t/p/w500{}", poster)),
        category: MOVIES_CATEGORY.to_string(),
        metadata,
    }
}

/// Well-known catalog genre ids, keyed by lowercase name
///
/// Used when the taxonomy endpoint cannot be reached.
pub fn default_movie_genres() -> HashMap<String, u32> {
    [
        ("action", 28),
        ("adventure", 12),
        ("animation", 16),
        ("comedy", 35),
        ("crime", 80),
        ("documentary", 99),
        ("drama", 18),
        ("family", 10751),
        ("fantasy", 14),
        ("history", 36),
        ("horror", 27),
        ("music", 10402),
        ("mystery", 9648),
        ("romance", 10749),
        ("science fiction", 878),
        ("tv movie", 10770),
        ("thriller", 53),
        ("war", 10752),
        ("western", 37),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id))
    .collect()
}
