pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::normalizer::RawEpisode;

pub use http_fetcher::HttpFetcher;

/// Query parameter carrying the requested page size.
pub const COUNT_PARAM: &str = "n";

/// Single-shot retrievals from the remote aggregator. Implementations never retry.
#[async_trait]
pub trait RemoteFetcher {
    async fn fetch_episodes(
        &self,
        url: &str,
        timeout: Duration,
        requested_count: usize,
    ) -> Result<Vec<RawEpisode>>;

    /// Returns the raw OPML document.
    async fn fetch_sources(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// Append the page size hint to an episode list URL.
pub fn with_count_hint(url: &str, requested_count: usize) -> Result<String> {
    let mut parsed = url::Url::parse(url)?;
    let others: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != COUNT_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(others)
        .append_pair(COUNT_PARAM, &requested_count.to_string());

    Ok(parsed.to_string())
}
