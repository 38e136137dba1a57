use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub length: Option<u64>,
}

/// Identity of the feed an episode was aggregated from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub stream_id: Option<String>,
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub feed_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub guid: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published: DateTime<Utc>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub origin: Option<Origin>,
    pub categories: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Episode {
    pub fn new(id: impl Into<String>, published: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            guid: None,
            title: None,
            url: None,
            published,
            content: None,
            author: None,
            enclosure: None,
            origin: None,
            categories: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Generate a deterministic ID for items that carry no identifier at all
    pub fn synthesize_id(url: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update([0u8]);
        hasher.update(title.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Compares everything except the write timestamp.
    pub fn same_content(&self, other: &Episode) -> bool {
        self.id == other.id
            && self.guid == other.guid
            && self.title == other.title
            && self.url == other.url
            && self.published == other.published
            && self.content == other.content
            && self.author == other.author
            && self.enclosure == other.enclosure
            && self.origin == other.origin
            && self.categories == other.categories
    }

    pub fn origin_title(&self) -> Option<&str> {
        self.origin.as_ref().and_then(|o| o.title.as_deref())
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}
