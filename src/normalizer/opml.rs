use chrono::{DateTime, Utc};
use opml::{Outline, OPML};

use crate::app::{PodcacheError, Result};
use crate::domain::{Source, DEFAULT_SOURCE_TYPE};
use crate::normalizer::decode_url;

const UNKNOWN_TITLE: &str = "Unknown";

/// Flatten an OPML document into sources.
///
/// Only two levels are considered: top-level outlines with children are
/// category groups, top-level outlines with an `xmlUrl` are uncategorized
/// feeds. Feeds without an `xmlUrl` are dropped.
pub fn parse_sources(xml: &str, now: DateTime<Utc>) -> Result<Vec<Source>> {
    let document =
        OPML::from_str(xml).map_err(|e| PodcacheError::Parse(format!("invalid OPML: {}", e)))?;

    let mut sources = Vec::new();
    for outline in &document.body.outlines {
        if !outline.outlines.is_empty() {
            let category = label(outline).unwrap_or_default();
            for child in &outline.outlines {
                push_feed(&mut sources, child, category, now);
            }
        } else {
            push_feed(&mut sources, outline, "", now);
        }
    }

    Ok(sources)
}

fn label(outline: &Outline) -> Option<&str> {
    Some(outline.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| outline.title.as_deref().filter(|t| !t.trim().is_empty()))
}

fn push_feed(sources: &mut Vec<Source>, outline: &Outline, category: &str, now: DateTime<Utc>) {
    let Some(xml_url) = outline.xml_url.as_deref().filter(|u| !u.trim().is_empty()) else {
        return;
    };

    sources.push(Source {
        title: label(outline).unwrap_or(UNKNOWN_TITLE).to_string(),
        xml_url: decode_url(xml_url),
        html_url: outline.html_url.as_deref().map(decode_url),
        source_type: outline
            .r#type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE_TYPE.to_string()),
        category: category.to_string(),
        order: sources.len() as i64,
        fetched_at: now,
    });
}
