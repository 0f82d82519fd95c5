//! Where the raw feed text comes from.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while retrieving the feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch did not complete within the caller's timeout.
    #[error("Feed fetch timed out after {0:?}")]
    Timeout(Duration),
    /// Transport-level failure (DNS, connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    /// A local feed file could not be read.
    #[error("Failed to read feed file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source of raw feed documents.
///
/// Implementations only retrieve text; timeouts are applied by the caller.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable description used in log messages.
    fn describe(&self) -> String;

    /// Retrieves the current feed document.
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches the feed over HTTP(S) with a GET request.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

/// Reads the feed from a local file, for offline imports.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Serves a fixed in-memory document.
#[derive(Debug, Clone)]
pub struct StaticFeedSource {
    document: String,
}

impl StaticFeedSource {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    fn describe(&self) -> String {
        "static feed".to_string()
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        Ok(self.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tempfile::tempdir;

    const FEED: &str = r#"{"producers": []}"#;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_fetch() {
        let base = serve(Router::new().route("/feed.json", get(|| async { FEED }))).await;
        let source = HttpFeedSource::new(format!("{}/feed.json", base));

        let body = source.fetch().await.unwrap();
        assert_eq!(body, FEED);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let base = serve(Router::new().route(
            "/feed.json",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let source = HttpFeedSource::new(format!("{}/feed.json", base));

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_http_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpFeedSource::new(format!("http://{}/feed.json", addr));
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[tokio::test]
    async fn test_file_fetch() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("feed.json");
        std::fs::write(&path, FEED).unwrap();

        let source = FileFeedSource::new(&path);
        assert_eq!(source.fetch().await.unwrap(), FEED);

        let missing = FileFeedSource::new(temp_dir.path().join("missing.json"));
        let err = missing.fetch().await.unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[tokio::test]
    async fn test_static_fetch() {
        let source = StaticFeedSource::new(FEED);
        assert_eq!(source.fetch().await.unwrap(), FEED);
        assert_eq!(source.describe(), "static feed");
    }
}
