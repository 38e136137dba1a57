use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Response};

use crate::app::error::{FetchCause, FetchError, Stage};
use crate::app::{PodcacheError, Result};
use crate::fetcher::{with_count_hint, RemoteFetcher};
use crate::normalizer::{parse_episode_list, RawEpisode};

pub const USER_AGENT: &str = concat!("podcache/", env!("CARGO_PKG_VERSION"));

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_OPML: &str = "text/x-opml, application/xml, text/xml;q=0.9, */*;q=0.1";

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PodcacheError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get(
        &self,
        stage: Stage,
        url: &str,
        accept: &'static str,
        timeout: Duration,
    ) -> std::result::Result<Response, FetchError> {
        tracing::debug!("GET {} ({}, timeout {:?})", url, stage, timeout);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(accept))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(stage, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError {
                stage,
                url: url.to_string(),
                cause: FetchCause::Status(status.as_u16()),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_episodes(
        &self,
        url: &str,
        timeout: Duration,
        requested_count: usize,
    ) -> Result<Vec<RawEpisode>> {
        let url = with_count_hint(url, requested_count)?;
        let response = self.get(Stage::Episodes, &url, ACCEPT_JSON, timeout).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(Stage::Episodes, &url, e))?;

        parse_episode_list(&body)
    }

    async fn fetch_sources(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.get(Stage::Sources, url, ACCEPT_OPML, timeout).await?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(Stage::Sources, url, e))?;

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            tokio::time::sleep(delay).await;
            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            request
        });

        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_fetch_episodes_sends_hint_and_headers() {
        let (base, handle) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"items":[{"id":"a"},{"id":"b"}]}"#,
            Duration::ZERO,
        )
        .await;

        let fetcher = HttpFetcher::new().unwrap();
        let items = fetcher
            .fetch_episodes(&format!("{}/items", base), Duration::from_secs(5), 250)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);

        let request = handle.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /items?n=250 "));
        assert!(request.contains("accept: application/json"));
        assert!(request.contains("user-agent: podcache/"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let (base, _handle) =
            serve_once("HTTP/1.1 503 Service Unavailable", "", Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch_sources(&format!("{}/opml", base), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            PodcacheError::Fetch(e) => {
                assert_eq!(e.stage, Stage::Sources);
                assert_eq!(e.cause, FetchCause::Status(503));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let (base, _handle) = serve_once("HTTP/1.1 200 OK", "{}", Duration::from_secs(2)).await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch_episodes(&base, Duration::from_millis(100), 10)
            .await
            .unwrap_err();

        match err {
            PodcacheError::Fetch(e) => assert_eq!(e.cause, FetchCause::Timeout),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
