use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keys of the `meta` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    LastEpisodesSync,
    LastSourcesSync,
    Settings,
}

impl MetaKey {
    pub const ALL: [MetaKey; 3] = [
        MetaKey::LastEpisodesSync,
        MetaKey::LastSourcesSync,
        MetaKey::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKey::LastEpisodesSync => "lastEpisodesSync",
            MetaKey::LastSourcesSync => "lastSourcesSync",
            MetaKey::Settings => "settings",
        }
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one pipeline run, stored under `lastEpisodesSync` / `lastSourcesSync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncRecord {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            success: false,
            count: 0,
            inserted: None,
            updated: None,
            error: Some(error.into()),
        }
    }
}

/// Operator overrides for the sync source URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub episodes_url: Option<String>,
    #[serde(default)]
    pub opml_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
