use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_TYPE: &str = "rss";

/// A feed entry from the OPML listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub title: String,
    pub xml_url: String,
    pub html_url: Option<String>,
    #[serde(rename = "type")]
    pub source_type: String,
    /// Empty for feeds outside any group outline.
    pub category: String,
    pub order: i64,
    pub fetched_at: DateTime<Utc>,
}
