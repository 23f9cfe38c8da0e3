use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{GatorError, Result};
use crate::config::FetchConfig;
use crate::domain::FetchedFeed;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;

pub struct HttpFetcher {
    client: Client,
    normalizer: Normalizer,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::with_timeout(
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    /// The timeout bounds the whole request, connect through body.
    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            normalizer: Normalizer::new(),
        })
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                GatorError::Timeout(url.to_string())
            } else {
                GatorError::Http(e)
            }
        };

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(classify)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
        let body = self.fetch_body(url).await?;
        let feed = self.normalizer.normalize(&body)?;
        tracing::debug!("Fetched {} items from {}", feed.items.len(), url);
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;

    const RSS_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Served Feed</title>
    <item>
      <title>Served Item</title>
      <link>https://example.com/served</link>
      <pubDate>Tue, 02 Jan 2024 10:00:00 +0100</pubDate>
      <description>Served &amp;amp; decoded</description>
    </item>
  </channel>
</rss>"#;

    async fn feed_handler() -> Response {
        (
            [(axum::http::header::CONTENT_TYPE, "application/rss+xml")],
            RSS_BODY,
        )
            .into_response()
    }

    async fn broken_handler() -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "temporary failure").into_response()
    }

    async fn garbage_handler() -> Response {
        "this is not xml".into_response()
    }

    async fn slow_handler() -> Response {
        tokio::time::sleep(Duration::from_secs(2)).await;
        RSS_BODY.into_response()
    }

    async fn spawn_test_server() -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/feed.xml", get(feed_handler))
            .route("/broken.xml", get(broken_handler))
            .route("/garbage.xml", get(garbage_handler))
            .route("/slow.xml", get(slow_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::with_timeout(timeout, "gator-test").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_items() {
        let (base, server) = spawn_test_server().await;

        let feed = fetcher(Duration::from_secs(5))
            .fetch(&format!("{base}/feed.xml"))
            .await
            .unwrap();

        assert_eq!(feed.title.as_deref(), Some("Served Feed"));
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link.as_deref(), Some("https://example.com/served"));
        assert_eq!(
            feed.items[0].description.as_deref(),
            Some("Served & decoded")
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (base, server) = spawn_test_server().await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("{base}/broken.xml"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::HttpStatus { status: 500, .. }));
        assert!(err.is_network());
        server.abort();
    }

    #[tokio::test]
    async fn test_missing_route_is_status_error() {
        let (base, server) = spawn_test_server().await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("{base}/nope.xml"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::HttpStatus { status: 404, .. }));
        server.abort();
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (base, server) = spawn_test_server().await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("{base}/garbage.xml"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::FeedParse(_)));
        assert!(!err.is_network());
        server.abort();
    }

    #[tokio::test]
    async fn test_timeout() {
        let (base, server) = spawn_test_server().await;

        let err = fetcher(Duration::from_millis(100))
            .fetch(&format!("{base}/slow.xml"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Timeout(_)));
        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(Duration::from_secs(5))
            .fetch(&format!("http://{address}/feed.xml"))
            .await
            .unwrap_err();

        assert!(err.is_network());
    }
}
