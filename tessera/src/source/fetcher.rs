//! Fetching of raw tile bytes.

use std::future::Future;

use bytes::Bytes;
use maybe_sync::{MaybeSend, MaybeSync};

use crate::error::TileLoadError;

/// Retrieves raw tile data by url.
///
/// Any `Fn(String) -> impl Future<Output = Result<Bytes, TileLoadError>>` is a fetcher, which
/// is handy for tests and for plugging in an existing http client.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait TileFetcher: MaybeSend + MaybeSync {
    /// Loads the data at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, TileLoadError>;
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<F, Fut> TileFetcher for F
where
    F: Fn(String) -> Fut + MaybeSend + MaybeSync,
    Fut: Future<Output = Result<Bytes, TileLoadError>> + MaybeSend,
{
    async fn fetch(&self, url: &str) -> Result<Bytes, TileLoadError> {
        (self)(url.to_string()).await
    }
}

/// Fetcher that downloads tiles with http GET requests.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Creates a fetcher with its own http client.
    pub fn new() -> Result<Self, TileLoadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tessera/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Creates a fetcher that uses the given client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, TileLoadError> {
        log::info!("Loading {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::info!("Failed to load {url}: {status}");
            return Err(TileLoadError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?)
    }
}
