use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::ResourceFetcher;
use crate::error::{Error, Result};

/// Fetcher serving resources from memory.
///
/// Unknown URLs answer like a missing remote file (HTTP 404). Useful for
/// previews of already-uploaded bytes and for tests.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(url.into(), bytes.into());
        }
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.resources
            .read()
            .ok()
            .and_then(|resources| resources.get(url).cloned())
            .ok_or_else(|| Error::FetchStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}
