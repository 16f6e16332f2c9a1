// Profile photo retrieval. Pluggable so hosts and tests can substitute
// the transport; the default fetcher is a bounded-timeout HTTP GET.

use std::time::Duration;

use async_trait::async_trait;

use social_broker_core::error::{BrokerError, ErrorKind, Result};

const PHOTO_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the binary content of a profile photo URL.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Default fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpPhotoFetcher {
    http: reqwest::Client,
}

impl HttpPhotoFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(PHOTO_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for HttpPhotoFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(|e| {
            BrokerError::auth(
                ErrorKind::AssetStoreError,
                format!("photo fetch failed: {}", if e.is_timeout() { "timeout" } else { "transport error" }),
            )
        })?;

        if !response.status().is_success() {
            return Err(BrokerError::auth(
                ErrorKind::AssetStoreError,
                format!("photo fetch returned status {}", response.status().as_u16()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| BrokerError::auth(ErrorKind::AssetStoreError, "photo body unreadable"))?;
        Ok(bytes.to_vec())
    }
}

/// Deterministic asset name for a profile photo.
pub fn photo_file_name(provider: &str, identifier: &str) -> String {
    format!("{}_{}.jpg", provider, identifier).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_lowercased() {
        assert_eq!(photo_file_name("google", "ABC123"), "google_abc123.jpg");
    }

    #[tokio::test]
    async fn unreachable_url_is_an_asset_error() {
        let fetcher = HttpPhotoFetcher::new();
        let err = fetcher.fetch("http://127.0.0.1:9/p.jpg").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssetStoreError);
    }
}
