//! HTTP fetcher that streams a response body into a staging file.

use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::Fetcher;
use crate::error::{UpdateError, UpdateResult};

/// Default timeout for a whole fetch, body included (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Streams HTTP(S) content to disk.
///
/// A fetch is complete only when the body ends and the byte count matches
/// the advertised `Content-Length`, when the server sent one.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> UpdateResult<Self> {
        Self::with_timeout(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
    }

    /// Create a fetcher with a custom timeout. `None` waits indefinitely.
    pub fn with_timeout(timeout: Option<Duration>) -> UpdateResult<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("stagehand/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| UpdateError::HttpClient(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn request_error(&self, url: &Url, e: reqwest::Error) -> UpdateError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => UpdateError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            },
            _ => UpdateError::transfer(url, e),
        }
    }

    async fn stream_to(&self, url: &Url, dest: &Path) -> UpdateResult<u64> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::transfer(
                url,
                format!("GET request failed with status {}", status),
            ));
        }

        let expected = response.content_length();
        let write_failed = |e: std::io::Error| {
            UpdateError::transfer(url, format!("write to {} failed: {}", dest.display(), e))
        };

        let mut file = File::create(dest).await.map_err(write_failed)?;
        let mut body = response.bytes_stream();
        let mut received = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.request_error(url, e))?;
            file.write_all(&chunk).await.map_err(write_failed)?;
            received += chunk.len() as u64;
        }

        file.flush().await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;

        verify_length(url, expected, received)?;
        debug!(url = %url, bytes = received, "Fetched to staging");
        Ok(received)
    }
}

/// Check a received byte count against the advertised length.
pub(crate) fn verify_length(url: &Url, expected: Option<u64>, received: u64) -> UpdateResult<()> {
    match expected {
        Some(expected) if expected != received => Err(UpdateError::transfer(
            url,
            format!("incomplete body: received {} of {} bytes", received, expected),
        )),
        _ => Ok(()),
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url, dest: &'a Path) -> BoxFuture<'a, UpdateResult<u64>> {
        Box::pin(self.stream_to(url, dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url() -> Url {
        Url::parse("http://example.com/app.zip").unwrap()
    }

    #[test]
    fn test_default_timeout() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(
            fetcher.timeout(),
            Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_without_timeout() {
        let fetcher = HttpFetcher::with_timeout(None).unwrap();
        assert_eq!(fetcher.timeout(), None);
    }

    #[test]
    fn test_verify_length() {
        assert!(verify_length(&url(), Some(10), 10).is_ok());
        assert!(verify_length(&url(), None, 3).is_ok());

        let err = verify_length(&url(), Some(10), 4).unwrap_err();
        assert!(err.to_string().contains("received 4 of 10 bytes"));
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/app.txt")
            .with_status(200)
            .with_body("new build")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("app.txt");
        let url = Url::parse(&format!("{}/app.txt", server.url())).unwrap();

        let bytes = HttpFetcher::new().unwrap().fetch(&url, &dest).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 9);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new build");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/missing.zip", server.url())).unwrap();

        let err = HttpFetcher::new()
            .unwrap()
            .fetch(&url, &temp.path().join("missing.zip"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!temp.path().join("missing.zip").exists());
    }
}
