pub mod opml;
pub mod raw;

use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde_json::Value;

use crate::domain::{Enclosure, Episode, Origin, Source};
use crate::app::Result;

pub use raw::{parse_episode_list, RawEpisode};

/// Pure transforms from upstream records into the canonical schema.
#[derive(Clone, Copy)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize_episodes(&self, raws: Vec<RawEpisode>, now: DateTime<Utc>) -> Vec<Episode> {
        raws.into_iter()
            .map(|raw| self.normalize_episode(raw, now))
            .collect()
    }

    /// `now` stands in for a missing publish time and stamps `fetched_at`.
    pub fn normalize_episode(&self, raw: RawEpisode, now: DateTime<Utc>) -> Episode {
        let url = first_href(raw.canonical.as_deref())
            .or_else(|| first_href(raw.alternate.as_deref()))
            .map(|href| decode_url(&href));

        let id = non_empty(raw.provider_id.as_deref())
            .or_else(|| non_empty(raw.guid.as_deref()))
            .or_else(|| non_empty(raw.id.as_deref()))
            .map(String::from)
            .unwrap_or_else(|| {
                Episode::synthesize_id(
                    url.as_deref().unwrap_or_default(),
                    raw.title.as_deref().unwrap_or_default(),
                )
            });

        let published = raw
            .published
            .as_ref()
            .and_then(epoch_seconds)
            .unwrap_or(now);

        let content = longest(
            raw.content.and_then(|c| c.content),
            raw.summary.and_then(|s| s.content),
        );

        let enclosure = raw
            .enclosure
            .and_then(|list| list.into_iter().next())
            .and_then(|first| {
                let href = non_empty(first.href.as_deref())?.to_string();
                Some(Enclosure {
                    url: decode_url(&href),
                    mime_type: first.mime_type,
                    length: first.length.as_ref().and_then(byte_length),
                })
            });

        let origin = raw.origin.map(|o| Origin {
            stream_id: o.stream_id,
            title: o.title,
            html_url: o.html_url.map(|u| decode_url(&u)),
            feed_url: o.feed_url.map(|u| decode_url(&u)),
        });

        Episode {
            id,
            guid: raw.guid,
            title: raw.title,
            url,
            published,
            content,
            author: raw.author,
            enclosure,
            origin,
            categories: raw.categories.unwrap_or_default(),
            fetched_at: now,
        }
    }

    pub fn normalize_sources(&self, xml: &str, now: DateTime<Utc>) -> Result<Vec<Source>> {
        opml::parse_sources(xml, now)
    }
}

/// Undo the entity encoding the upstream transport applies to embedded URLs.
pub fn decode_url(raw: &str) -> String {
    decode_html_entities(raw).into_owned()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn first_href(links: Option<&[raw::RawLink]>) -> Option<String> {
    links?
        .first()
        .and_then(|link| non_empty(link.href.as_deref()))
        .map(String::from)
}

fn longest(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.len() > a.len() { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn epoch_seconds(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}

fn byte_length(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn raw(json: &str) -> RawEpisode {
        serde_json::from_str(json).unwrap()
    }

    const FULL_ITEM: &str = r#"{
        "providerId": "provider-1",
        "guid": "guid-1",
        "id": "tag:google.com,2005:reader/item/0001",
        "title": "Episode One",
        "canonical": [{"href": "https://example.com/ep1?a=1&amp;b=2"}],
        "alternate": [{"href": "https://example.com/alt", "type": "text/html"}],
        "published": 1704067200,
        "summary": {"content": "short"},
        "content": {"content": "<p>a much longer body</p>"},
        "author": "Host",
        "enclosure": [
            {"href": "https://cdn.example/a&amp;b.mp3", "type": "audio/mpeg", "length": "12345"},
            {"href": "https://cdn.example/second.mp3"}
        ],
        "origin": {
            "streamId": "feed/1",
            "title": "Rust Radio",
            "htmlUrl": "https://rustradio.example/",
            "feedUrl": "https://rustradio.example/feed?x=1&amp;y=2"
        },
        "categories": ["user/-/state/com.google/reading-list", "Tech"]
    }"#;

    #[test]
    fn test_full_item() {
        let ep = Normalizer::new().normalize_episode(raw(FULL_ITEM), now());

        assert_eq!(ep.id, "provider-1");
        assert_eq!(ep.guid.as_deref(), Some("guid-1"));
        assert_eq!(ep.url.as_deref(), Some("https://example.com/ep1?a=1&b=2"));
        assert_eq!(ep.published, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(ep.content.as_deref(), Some("<p>a much longer body</p>"));
        assert_eq!(ep.author.as_deref(), Some("Host"));
        assert_eq!(ep.categories.len(), 2);
        assert_eq!(ep.fetched_at, now());

        let enclosure = ep.enclosure.unwrap();
        assert_eq!(enclosure.url, "https://cdn.example/a&b.mp3");
        assert_eq!(enclosure.mime_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(enclosure.length, Some(12345));

        let origin = ep.origin.unwrap();
        assert_eq!(origin.title.as_deref(), Some("Rust Radio"));
        assert_eq!(
            origin.feed_url.as_deref(),
            Some("https://rustradio.example/feed?x=1&y=2")
        );
    }

    #[test]
    fn test_id_priority() {
        let n = Normalizer::new();
        let ep = n.normalize_episode(raw(r#"{"providerId":"p","guid":"g","id":"r"}"#), now());
        assert_eq!(ep.id, "p");

        let ep = n.normalize_episode(raw(r#"{"guid":"g","id":"r"}"#), now());
        assert_eq!(ep.id, "g");

        let ep = n.normalize_episode(raw(r#"{"providerId":"","id":"r"}"#), now());
        assert_eq!(ep.id, "r");
    }

    #[test]
    fn test_synthesized_id_is_stable() {
        let n = Normalizer::new();
        let json = r#"{"title":"No ids","alternate":[{"href":"https://example.com/x"}]}"#;
        let first = n.normalize_episode(raw(json), now());
        let second = n.normalize_episode(raw(json), now() + chrono::Duration::hours(1));
        assert_eq!(first.id, second.id);
        assert_eq!(first.url.as_deref(), Some("https://example.com/x"));
    }

    #[test]
    fn test_published_defaults_to_now() {
        let n = Normalizer::new();
        let missing = n.normalize_episode(raw(r#"{"id":"a"}"#), now());
        assert_eq!(missing.published, now());

        let garbage = n.normalize_episode(raw(r#"{"id":"a","published":"yesterday"}"#), now());
        assert_eq!(garbage.published, now());

        let string_secs = n.normalize_episode(raw(r#"{"id":"a","published":"1704067200"}"#), now());
        assert_eq!(
            string_secs.published,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_optional_blocks_absent() {
        let ep = Normalizer::new().normalize_episode(raw(r#"{"id":"a","enclosure":[]}"#), now());
        assert!(ep.enclosure.is_none());
        assert!(ep.origin.is_none());
        assert!(ep.url.is_none());
        assert!(ep.content.is_none());
        assert!(ep.categories.is_empty());
    }

    #[test]
    fn test_content_falls_back_to_summary() {
        let ep = Normalizer::new()
            .normalize_episode(raw(r#"{"id":"a","summary":{"content":"only summary"}}"#), now());
        assert_eq!(ep.content.as_deref(), Some("only summary"));
    }

    #[test]
    fn test_decode_url_entities() {
        assert_eq!(
            decode_url("https://x.example/?q=&quot;a&quot;&amp;t=&#39;1&#39;&lt;&gt;"),
            "https://x.example/?q=\"a\"&t='1'<>"
        );
        assert_eq!(decode_url("https://plain.example/a.mp3"), "https://plain.example/a.mp3");
    }
}
