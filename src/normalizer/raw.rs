//! Upstream record shapes as they arrive on the wire.
//!
//! Every field is optional; presence is validated during normalization.

use serde::Deserialize;
use serde_json::Value;

use crate::app::{PodcacheError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLink {
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawText {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnclosure {
    #[serde(alias = "url")]
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    /// Byte size; number or numeric string depending on the aggregator.
    pub length: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrigin {
    pub stream_id: Option<String>,
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub feed_url: Option<String>,
}

/// One item of a greader-style `items` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEpisode {
    #[serde(rename = "providerId", alias = "frss:id")]
    pub provider_id: Option<String>,
    pub guid: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub canonical: Option<Vec<RawLink>>,
    pub alternate: Option<Vec<RawLink>>,
    /// Unix epoch seconds.
    pub published: Option<Value>,
    pub content: Option<RawText>,
    pub summary: Option<RawText>,
    pub author: Option<String>,
    pub enclosure: Option<Vec<RawEnclosure>>,
    pub origin: Option<RawOrigin>,
    pub categories: Option<Vec<String>>,
}

/// Parse a greader envelope (`{"items": [...]}`) or a bare item array.
///
/// Items that do not match the expected shape are dropped with a warning
/// rather than failing the whole batch.
pub fn parse_episode_list(body: &[u8]) -> Result<Vec<RawEpisode>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PodcacheError::Parse(format!("invalid episode JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(PodcacheError::Parse(
                    "episode JSON `items` is not an array".into(),
                ))
            }
        },
        _ => {
            return Err(PodcacheError::Parse(
                "episode JSON is neither an object nor an array".into(),
            ))
        }
    };

    let total = items.len();
    let episodes: Vec<RawEpisode> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!("Dropping malformed episode record: {}", e);
                None
            }
        })
        .collect();

    if episodes.len() < total {
        tracing::debug!("Kept {} of {} episode records", episodes.len(), total);
    }

    Ok(episodes)
}
