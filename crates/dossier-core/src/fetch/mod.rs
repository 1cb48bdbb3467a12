mod http;
mod memory;
mod traits;

pub use http::{HttpFetcher, Location};
pub use memory::MemoryFetcher;
pub use traits::ResourceFetcher;

use crate::config::FetchConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the fetcher for file references from configuration
pub fn create_fetcher(config: &FetchConfig) -> Result<Arc<dyn ResourceFetcher>> {
    Ok(Arc::new(HttpFetcher::new(config)?))
}

/// Create the fetcher for operator-configured locations such as the font,
/// which may always be read from local disk.
pub fn create_config_fetcher(config: &FetchConfig) -> Result<Arc<dyn ResourceFetcher>> {
    Ok(Arc::new(HttpFetcher::new(config)?.with_local_reads(true)))
}
