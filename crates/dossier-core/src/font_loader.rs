//! Loading the complex-script font.

use tracing::{info, warn};

use crate::config::FontConfig;
use crate::fetch::ResourceFetcher;
use crate::pdf::EmbeddedFont;
use crate::util::run_blocking;

/// Fetch and parse the configured Bengali font.
///
/// Any failure (fetch or parse) is logged and yields `None`; callers fall
/// back to Helvetica, so Bengali values render with substitute glyphs.
pub async fn load_font(fetcher: &dyn ResourceFetcher, config: &FontConfig) -> Option<EmbeddedFont> {
    let bytes = match fetcher.fetch(&config.url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Bengali font unavailable, using Helvetica: {}", e);
            return None;
        }
    };

    let family = config.family.clone();
    match run_blocking(move || EmbeddedFont::from_bytes(&family, bytes)).await {
        Ok(font) => {
            info!("Loaded font '{}' from {}", config.family, config.url);
            Some(font)
        }
        Err(e) => {
            warn!("Ignoring font at {}: {}", config.url, e);
            None
        }
    }
}
