//! In-process doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::error::{FetchCause, FetchError, Stage};
use crate::app::{PodcacheError, Result};
use crate::domain::{Episode, MetaKey, Source};
use crate::fetcher::RemoteFetcher;
use crate::normalizer::{parse_episode_list, RawEpisode};
use crate::store::{EpisodeQuery, Store};

type Scripted = std::result::Result<String, FetchCause>;

/// Serves canned bodies and counts calls.
pub struct ScriptedFetcher {
    episodes: Mutex<Scripted>,
    opml: Mutex<Scripted>,
    delay: Duration,
    pub episode_calls: AtomicUsize,
    pub source_calls: AtomicUsize,
    pub last_count: AtomicUsize,
    pub last_episodes_url: Mutex<Option<String>>,
}

impl ScriptedFetcher {
    pub fn new(episodes_json: &str, opml: &str) -> Self {
        Self {
            episodes: Mutex::new(Ok(episodes_json.to_string())),
            opml: Mutex::new(Ok(opml.to_string())),
            delay: Duration::ZERO,
            episode_calls: AtomicUsize::new(0),
            source_calls: AtomicUsize::new(0),
            last_count: AtomicUsize::new(0),
            last_episodes_url: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_episodes(&self, body: Scripted) {
        *self.episodes.lock().unwrap() = body;
    }

    pub fn set_opml(&self, body: Scripted) {
        *self.opml.lock().unwrap() = body;
    }

    pub fn episode_calls(&self) -> usize {
        self.episode_calls.load(Ordering::SeqCst)
    }

    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }

    fn failure(stage: Stage, url: &str, cause: FetchCause) -> PodcacheError {
        PodcacheError::Fetch(FetchError {
            stage,
            url: url.to_string(),
            cause,
        })
    }
}

#[async_trait]
impl RemoteFetcher for ScriptedFetcher {
    async fn fetch_episodes(
        &self,
        url: &str,
        _timeout: Duration,
        requested_count: usize,
    ) -> Result<Vec<RawEpisode>> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        self.last_count.store(requested_count, Ordering::SeqCst);
        *self.last_episodes_url.lock().unwrap() = Some(url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.episodes.lock().unwrap().clone();
        match scripted {
            Ok(body) => parse_episode_list(body.as_bytes()),
            Err(cause) => Err(Self::failure(Stage::Episodes, url, cause)),
        }
    }

    async fn fetch_sources(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.opml.lock().unwrap().clone();
        scripted.map_err(|cause| Self::failure(Stage::Sources, url, cause))
    }
}

/// A store whose backing database is gone.
pub struct UnavailableStore;

fn unavailable<T>() -> Result<T> {
    Err(PodcacheError::StoreUnavailable("no database configured".into()))
}

impl Store for UnavailableStore {
    fn get_episode(&self, _id: &str) -> Result<Option<Episode>> {
        unavailable()
    }

    fn put_episode(&self, _episode: &Episode) -> Result<()> {
        unavailable()
    }

    fn list_episodes(&self, _query: &EpisodeQuery) -> Result<Vec<Episode>> {
        unavailable()
    }

    fn count_episodes(&self, _source: Option<&str>) -> Result<usize> {
        unavailable()
    }

    fn replace_sources(&self, _sources: &[Source]) -> Result<usize> {
        unavailable()
    }

    fn list_sources(&self, _category: Option<&str>) -> Result<Vec<Source>> {
        unavailable()
    }

    fn count_sources(&self) -> Result<usize> {
        unavailable()
    }

    fn source_categories(&self) -> Result<Vec<String>> {
        unavailable()
    }

    fn get_meta(&self, _key: MetaKey) -> Result<Option<serde_json::Value>> {
        unavailable()
    }

    fn put_meta(&self, _key: MetaKey, _value: &serde_json::Value) -> Result<()> {
        unavailable()
    }

    fn clear_cache(&self) -> Result<()> {
        unavailable()
    }
}

/// A greader envelope holding `count` items published one hour apart,
/// newest first, ids `ep-0`, `ep-1`, ...
pub fn episodes_json(count: usize) -> String {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("ep-{}", i),
                "title": format!("Episode {}", i),
                "published": 1_704_067_200i64 - (i as i64) * 3600,
                "alternate": [{"href": format!("https://example.com/ep-{}", i)}],
                "origin": {"streamId": "feed/1", "title": "Rust Radio"}
            })
        })
        .collect();
    serde_json::json!({ "items": items }).to_string()
}

pub const OPML_TECH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Tech">
      <outline text="Rust Radio" xmlUrl="https://rustradio.example/feed"/>
      <outline text="Go Time" xmlUrl="https://gotime.example/feed"/>
    </outline>
    <outline text="Solo Show" xmlUrl="https://solo.example/rss"/>
  </body>
</opml>"#;

pub const OPML_SUBSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Tech">
      <outline text="Go Time" xmlUrl="https://gotime.example/feed"/>
    </outline>
  </body>
</opml>"#;
