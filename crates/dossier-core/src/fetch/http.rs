use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::traits::ResourceFetcher;
use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Where a resource reference actually points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}

/// Fetcher for http(s) URLs, and `file://` URLs and local paths when
/// local reads are allowed.
///
/// Root-relative references (`/fonts/x.ttf`) go to `base_url` when one is
/// configured and to the filesystem otherwise.
pub struct HttpFetcher {
    client: Client,
    base_url: Option<String>,
    timeout: Duration,
    allow_local: bool,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigInvalid {
                field: "fetch".to_string(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_ref()
                .map(|b| b.trim_end_matches('/').to_string())
                .filter(|b| !b.is_empty()),
            timeout,
            allow_local: config.allow_local,
        })
    }

    /// Override `fetch.allow_local`.
    #[must_use]
    pub fn with_local_reads(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    /// Decide how `url` will be retrieved.
    pub fn resolve(&self, url: &str) -> Location {
        let url = url.trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            return Location::Remote(url.to_string());
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Location::Local(PathBuf::from(path));
        }
        match &self.base_url {
            Some(base) if url.starts_with('/') => Location::Remote(format!("{base}{url}")),
            _ => Location::Local(PathBuf::from(url)),
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let request = async {
            let response = self.client.get(url).send().await.map_err(|e| map_reqwest(url, &e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::FetchStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(|e| map_reqwest(url, &e))?;
            Ok(body.to_vec())
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::FetchTimeout { url: url.to_string() })?
    }
}

fn map_reqwest(url: &str, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout { url: url.to_string() }
    } else {
        Error::FetchTransport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = match self.resolve(url) {
            Location::Remote(remote) => self.fetch_remote(&remote).await?,
            Location::Local(_) if !self.allow_local => {
                return Err(Error::FetchLocalDisabled { url: url.to_string() });
            }
            Location::Local(path) => {
                tokio::fs::read(&path).await.map_err(|e| Error::FetchLocal {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fetcher(base_url: Option<&str>) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            base_url: base_url.map(str::to_string),
            allow_local: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_absolute_urls() {
        let f = fetcher(Some("https://admin.example.com/"));
        assert_eq!(
            f.resolve("https://cdn.example.com/a.jpg"),
            Location::Remote("https://cdn.example.com/a.jpg".to_string())
        );
        assert_eq!(
            f.resolve("file:///srv/fonts/bn.ttf"),
            Location::Local(PathBuf::from("/srv/fonts/bn.ttf"))
        );
    }

    #[test]
    fn test_resolve_root_relative() {
        assert_eq!(
            fetcher(Some("https://admin.example.com/")).resolve("/fonts/SolaimanLipi.ttf"),
            Location::Remote("https://admin.example.com/fonts/SolaimanLipi.ttf".to_string())
        );
        assert_eq!(
            fetcher(None).resolve("/fonts/SolaimanLipi.ttf"),
            Location::Local(PathBuf::from("/fonts/SolaimanLipi.ttf"))
        );
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF-1.5 test").unwrap();

        let bytes = fetcher(None).fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.5 test");
    }

    #[tokio::test]
    async fn test_local_reads_off_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.png");
        std::fs::write(&path, b"not for download").unwrap();

        let remote_only = HttpFetcher::new(&FetchConfig::default()).unwrap();
        for url in [
            path.to_str().unwrap().to_string(),
            format!("file://{}", path.display()),
            "/fonts/SolaimanLipi.ttf".to_string(),
        ] {
            let err = remote_only.fetch(&url).await.unwrap_err();
            assert!(matches!(err, Error::FetchLocalDisabled { .. }), "{url}: {err}");
            assert!(err.is_per_file());
        }

        let local = HttpFetcher::new(&FetchConfig::default()).unwrap().with_local_reads(true);
        assert_eq!(local.fetch(path.to_str().unwrap()).await.unwrap(), b"not for download");
    }

    #[tokio::test]
    async fn test_missing_local_file_is_per_file_error() {
        let err = fetcher(None)
            .fetch("/definitely/not/here/nid-front.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FetchLocal { .. }));
        assert!(err.is_per_file());
    }
}
