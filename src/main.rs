use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use suggestion_feed::{
    config::{Config, StorageBackend},
    db::{
        create_redis_client, FileStore, KeyValueStore, MemoryStore, RedisStore,
        DISMISSALS_NAMESPACE, PREFERENCES_NAMESPACE,
    },
    models::{FilterSet, MOVIES_CATEGORY},
    services::{SuggestionFeedRepository, TmdbClient},
    state::AppState,
    stores::{DismissalStore, PreferenceStore, SavedChoiceStore},
};

const USAGE: &str = "usage: suggestion-feed [feed | cached | dismiss <id> | undo <id> | \
clear-dismissals | select <category> | filters <key=v1,v2>... | profile | reset-preferences]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("feed");

    match (command, &args[1.min(args.len())..]) {
        ("feed", _) => print_json(&state.apply_preferences().await)?,
        ("cached", _) => print_json(&state.current_feed().await)?,
        ("dismiss", [id]) => {
            state.decline(id).await;
            println!("{} dismissed ({} total)", id, state.dismissals.count().await);
        }
        ("undo", [id]) => {
            if state.undo_decline(id).await {
                println!("{} restored", id);
            } else {
                println!("{} was not dismissed", id);
            }
        }
        ("clear-dismissals", _) => {
            state.dismissals.clear().await;
            println!("dismissals cleared");
        }
        ("select", [category]) => {
            state.preferences.set_selected_category(category).await;
            println!("selected category: {}", category);
        }
        ("filters", pairs) if !pairs.is_empty() => {
            let filters = FilterSet::from_string_map(&parse_filter_args(pairs)?);
            let profile = state.preferences.get_current_profile().await;
            let category = profile
                .selected_category
                .unwrap_or_else(|| MOVIES_CATEGORY.to_string());
            state.preferences.set_filters(&category, filters).await;
            print_json(&state.preferences.get_current_profile().await)?;
        }
        ("profile", _) => print_json(&state.preferences.get_current_profile().await)?,
        ("reset-preferences", _) => {
            state.preferences.reset().await;
            println!("preferences reset");
        }
        _ => anyhow::bail!(USAGE),
    }

    Ok(())
}

/// Wires every component once; nothing below reaches for globals
async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let catalog = TmdbClient::from_config(config).context("Failed to build catalog client")?;

    let dismissals = DismissalStore::load(open_storage(config, DISMISSALS_NAMESPACE).await).await;
    let preferences =
        PreferenceStore::load(open_storage(config, PREFERENCES_NAMESPACE).await).await;

    Ok(AppState::new(
        Arc::new(SuggestionFeedRepository::new(Arc::new(catalog))),
        Arc::new(dismissals),
        Arc::new(preferences),
        Arc::new(SavedChoiceStore::new()),
    ))
}

/// Opens the configured backend, falling back to memory if it is unavailable
async fn open_storage(config: &Config, namespace: &str) -> Arc<dyn KeyValueStore> {
    match config.storage_backend {
        StorageBackend::File => match FileStore::open(&config.data_dir, namespace).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    namespace = %namespace,
                    "File storage unavailable, using memory"
                );
                Arc::new(MemoryStore::new(namespace))
            }
        },
        StorageBackend::Redis => match create_redis_client(&config.redis_url) {
            Ok(client) => Arc::new(RedisStore::new(client, namespace)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    namespace = %namespace,
                    "Redis storage unavailable, using memory"
                );
                Arc::new(MemoryStore::new(namespace))
            }
        },
        StorageBackend::Memory => Arc::new(MemoryStore::new(namespace)),
    }
}

/// Parses `genres=Action,Comedy year=2010` into the string-map filter form
fn parse_filter_args(pairs: &[String]) -> anyhow::Result<BTreeMap<String, Vec<String>>> {
    pairs
        .iter()
        .map(|pair| -> anyhow::Result<(String, Vec<String>)> {
            let (key, values) = pair
                .split_once('=')
                .with_context(|| format!("Expected key=value, got {}", pair))?;
            let values = values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            Ok((key.trim().to_string(), values))
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
