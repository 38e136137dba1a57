//! Runtime overrides of the sync source URLs.

use chrono::Utc;
use serde::Serialize;

use crate::app::Result;
use crate::config::SyncConfig;
use crate::domain::Settings;
use crate::store::Store;

/// Sync URLs after applying any persisted override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveUrls {
    pub episodes_url: Option<String>,
    pub opml_url: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Non-empty persisted values win; a missing record or store error falls back to `config`.
pub fn resolve_urls<S: Store + ?Sized>(store: &S, config: &SyncConfig) -> EffectiveUrls {
    let settings = match store.settings() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Could not read settings, using static config: {}", e);
            Settings::default()
        }
    };

    EffectiveUrls {
        episodes_url: non_empty(settings.episodes_url.as_deref())
            .or_else(|| non_empty(config.episodes_url.as_deref())),
        opml_url: non_empty(settings.opml_url.as_deref())
            .or_else(|| non_empty(config.opml_url.as_deref())),
    }
}

/// Persist URL overrides. Blank values clear the override for that field.
pub fn save_settings<S: Store + ?Sized>(
    store: &S,
    episodes_url: Option<&str>,
    opml_url: Option<&str>,
) -> Result<Settings> {
    let settings = Settings {
        episodes_url: non_empty(episodes_url),
        opml_url: non_empty(opml_url),
        updated_at: Some(Utc::now()),
    };
    store.put_settings(&settings)?;

    tracing::info!(
        "Saved settings (episodes_url: {}, opml_url: {})",
        settings.episodes_url.as_deref().unwrap_or("<static>"),
        settings.opml_url.as_deref().unwrap_or("<static>")
    );

    Ok(settings)
}
