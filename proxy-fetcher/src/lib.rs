//! Fetches artifacts from upstream registries.
//!
//! [`Fetcher`] is deliberately thin: it knows nothing about ecosystems,
//! identities, or the index. The cache core calls it with a fully-resolved
//! upstream URL (built by an adapter) and gets back a byte stream plus
//! whatever metadata the response carried. Every non-2xx response and every
//! transport failure becomes a [`FetchError`], which the cache core maps onto
//! `ProxyError::UpstreamUnavailable`.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncRead;

pub type FetchReader = Pin<Box<dyn AsyncRead + Send>>;

/// An upstream response, still unread.
pub struct FetchedResponse {
    pub reader: FetchReader,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Network(String),

    #[error("upstream returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError>;
}

#[async_trait]
impl Fetcher for Arc<dyn Fetcher> {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        (**self).fetch(url).await
    }
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`].
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// A client with sane timeouts for registry traffic: a short connect
    /// timeout and no overall timeout (artifacts can be large).
    pub fn default_client() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let content_length = response.content_length();

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::other(e.to_string()));
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(FetchedResponse {
            reader: Box::pin(reader),
            content_type,
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_successful_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lodash-4.17.21.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tarball bytes".to_vec()).insert_header("content-type", "application/octet-stream"))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::default_client().unwrap();
        let mut response = fetcher
            .fetch(&format!("{}/lodash-4.17.21.tgz", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.content_type.as_deref(), Some("application/octet-stream"));

        let mut buf = Vec::new();
        response.reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"tarball bytes");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.tgz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::default_client().unwrap();
        let err = fetcher.fetch(&format!("{}/missing.tgz", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        let fetcher = ReqwestFetcher::default_client().unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
