use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive bounds on the catalog's average vote
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RatingRange {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// A single filter the user chose for a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Filter {
    /// Genre names as shown to the user (e.g. "Action")
    Genres(Vec<String>),
    /// ISO 639-1 language codes
    Languages(Vec<String>),
    Rating(RatingRange),
    Year(u16),
}

impl Filter {
    fn same_kind(&self, other: &Filter) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Filters for one category, at most one per kind
///
/// Stored as a plain list; loading goes through [`FilterSet::insert`] so a
/// later filter of the same kind wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "Vec<Filter>", into = "Vec<Filter>")]
pub struct FilterSet(Vec<Filter>);

impl From<Vec<Filter>> for FilterSet {
    fn from(filters: Vec<Filter>) -> Self {
        let mut set = FilterSet::new();
        for filter in filters {
            set.insert(filter);
        }
        set
    }
}

impl From<FilterSet> for Vec<Filter> {
    fn from(set: FilterSet) -> Self {
        set.0
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSet::insert`]
    pub fn with(mut self, filter: Filter) -> Self {
        self.insert(filter);
        self
    }

    /// Adds a filter, replacing any existing filter of the same kind in place
    pub fn insert(&mut self, filter: Filter) {
        if let Some(existing) = self.0.iter_mut().find(|f| f.same_kind(&filter)) {
            *existing = filter;
        } else {
            self.0.push(filter);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn genres(&self) -> &[String] {
        self.0
            .iter()
            .find_map(|f| match f {
                Filter::Genres(genres) => Some(genres.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Parses the untyped `name -> values` form used by older clients and the CLI
    ///
    /// Recognised keys: `genres`, `languages`, `min_rating`, `max_rating`, `year`.
    pub fn from_string_map(map: &BTreeMap<String, Vec<String>>) -> Self {
        let mut set = FilterSet::new();
        let mut rating = RatingRange::default();

        for (key, values) in map {
            match key.as_str() {
                "genres" => set.insert(Filter::Genres(values.clone())),
                "languages" => set.insert(Filter::Languages(values.clone())),
                "min_rating" => rating.min = parse_first(key, values),
                "max_rating" => rating.max = parse_first(key, values),
                "year" => {
                    if let Some(year) = parse_first(key, values) {
                        set.insert(Filter::Year(year));
                    }
                }
                _ => tracing::warn!(filter = %key, "Ignoring unknown filter key"),
            }
        }

        if rating.min.is_some() || rating.max.is_some() {
            set.insert(Filter::Rating(rating));
        }

        set
    }
}

fn parse_first<T: std::str::FromStr>(key: &str, values: &[String]) -> Option<T> {
    let raw = values.first()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(filter = %key, value = %raw, "Ignoring unparseable filter value");
            None
        }
    }
}

/// Stored filters for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceSet {
    pub category_id: String,
    pub filters: FilterSet,
    pub last_updated: DateTime<Utc>,
}

/// Snapshot of everything the preference store knows about the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    pub selected_category: Option<String>,
    pub filters_by_category: BTreeMap<String, PreferenceSet>,
}

impl UserProfile {
    pub fn filters_for(&self, category_id: &str) -> Option<&FilterSet> {
        self.filters_by_category
            .get(category_id)
            .map(|prefs| &prefs.filters)
    }
}
