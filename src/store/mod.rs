pub mod sqlite;

use crate::app::Result;
use crate::domain::{Episode, MetaKey, Settings, Source, SyncRecord};

pub use sqlite::SqliteStore;

/// Page request against the episode collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeQuery {
    pub limit: usize,
    pub offset: usize,
    /// Case-insensitive substring of the origin title.
    pub source: Option<String>,
}

pub trait Store {
    // Episode operations
    fn get_episode(&self, id: &str) -> Result<Option<Episode>>;
    /// Insert or fully replace the episode with the same id.
    fn put_episode(&self, episode: &Episode) -> Result<()>;
    fn list_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Episode>>;
    fn count_episodes(&self, source: Option<&str>) -> Result<usize>;

    // Source operations
    /// Delete every stored source, then insert `sources`. Returns the number inserted.
    fn replace_sources(&self, sources: &[Source]) -> Result<usize>;
    fn list_sources(&self, category: Option<&str>) -> Result<Vec<Source>>;
    fn count_sources(&self) -> Result<usize>;
    fn source_categories(&self) -> Result<Vec<String>>;

    // Meta operations
    fn get_meta(&self, key: MetaKey) -> Result<Option<serde_json::Value>>;
    fn put_meta(&self, key: MetaKey, value: &serde_json::Value) -> Result<()>;
    /// Drop episodes, sources and every meta record except `settings`.
    fn clear_cache(&self) -> Result<()>;

    fn sync_record(&self, key: MetaKey) -> Result<Option<SyncRecord>> {
        match self.get_meta(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put_sync_record(&self, key: MetaKey, record: &SyncRecord) -> Result<()> {
        self.put_meta(key, &serde_json::to_value(record)?)
    }

    fn settings(&self) -> Result<Option<Settings>> {
        match self.get_meta(MetaKey::Settings)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put_settings(&self, settings: &Settings) -> Result<()> {
        self.put_meta(MetaKey::Settings, &serde_json::to_value(settings)?)
    }
}
