use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use catalogdb_core::config::expand_path;
use catalogdb_core::traits::ImageFetcher;

/// Fetches `http(s)://` URLs with reqwest; `file://` URLs and bare paths are
/// read from disk so seed catalogs work offline.
pub struct UrlImageFetcher {
    client: reqwest::Client,
}

impl UrlImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build image HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for UrlImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("requesting {url}"))?
                .error_for_status()
                .with_context(|| format!("bad status for {url}"))?;
            let body = response.bytes().await.with_context(|| format!("reading body of {url}"))?;
            return Ok(body.to_vec());
        }
        let path = expand_path(url.strip_prefix("file://").unwrap_or(url));
        tokio::fs::read(&path).await.with_context(|| format!("reading image {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_local_files_and_reports_missing_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("img.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let fetcher = UrlImageFetcher::new(Duration::from_secs(1)).unwrap();

        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&url).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).await.unwrap(), vec![1, 2, 3]);
        assert!(fetcher.fetch(&format!("{}/missing.png", tmp.path().display())).await.is_err());
    }
}
