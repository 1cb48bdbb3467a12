use async_trait::async_trait;

use crate::error::Result;

/// Source of the binary resources (images, PDFs, fonts) a dossier refers to.
///
/// Implementations must report a non-success response as an error rather
/// than returning the error body, so callers can skip the file.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Retrieve the full body of `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
