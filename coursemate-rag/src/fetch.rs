//! Reading raw document bytes from a source locator.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RagError, Result};

/// Downloads the whole payload behind a remote URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch every byte at `url`. Failures surface as [`RagError::Fetch`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Whether `locator` names a remote HTTP(S) resource.
pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Read a local file locator.
pub async fn read_local(path: &str) -> Result<Vec<u8>> {
    debug!(path, "reading local document");
    tokio::fs::read(path).await.map_err(|e| RagError::Fetch(format!("failed to read {path}: {e}")))
}

/// A [`SourceFetcher`] backed by `reqwest`.
///
/// This type is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSourceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client (shared connection pool, custom timeouts).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading document");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::Fetch(format!("{url} returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RagError::Fetch(format!("failed to read body of {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_schemes_are_remote() {
        assert!(is_remote("https://res.cloudinary.com/x.pdf"));
        assert!(is_remote("http://localhost/x.pdf"));
        assert!(!is_remote("/tmp/x.pdf"));
        assert!(!is_remote("ftp://host/x.pdf"));
    }

    #[tokio::test]
    async fn missing_local_file_is_a_fetch_error() {
        let err = read_local("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, RagError::Fetch(_)));
    }
}
