//! Asset transport.
//!
//! The pool only needs "give me a status, a length and a byte stream",
//! expressed as [`AssetFetcher`] so tests can script transfers without a
//! network. The real implementation streams reqwest bodies through a
//! [`StreamReader`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::error::Result;

/// Image hosts reject requests without a gallery referer.
const ASSET_REFERER: &str = "https://www.pixiv.net";

/// Whole-transfer timeout for one asset.
const FETCH_TIMEOUT: Duration = Duration::from_secs(150);

pub struct AssetResponse {
    pub status: u16,
    /// Declared body length, when the server sends one.
    pub content_length: Option<u64>,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<AssetResponse>;
}

pub struct ReqwestAssetFetcher {
    client: Client,
}

impl ReqwestAssetFetcher {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Referer", HeaderValue::from_static(ASSET_REFERER));

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for ReqwestAssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for ReqwestAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

        Ok(AssetResponse {
            status,
            content_length,
            reader: Box::new(StreamReader::new(stream)),
        })
    }
}
