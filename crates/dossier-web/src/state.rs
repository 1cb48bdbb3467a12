use anyhow::{Context, Result};
use dossier_core::{AppConfig, DossierAssembler, ResourceFetcher};
use std::sync::Arc;

use crate::preview_store::PreviewStore;

/// Global application state
pub struct AppState {
    /// Shared across requests so the Bengali font is fetched once
    pub assembler: DossierAssembler,
    pub previews: PreviewStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let previews = PreviewStore::new(&config.preview);
        let assembler = DossierAssembler::new(config).context("Failed to create fetcher")?;
        Ok(Self {
            assembler,
            previews,
        })
    }

    /// State with a custom fetcher, for tests and offline use.
    pub fn with_fetcher(fetcher: Arc<dyn ResourceFetcher>, config: AppConfig) -> Self {
        let previews = PreviewStore::new(&config.preview);
        Self {
            assembler: DossierAssembler::with_fetcher(fetcher, config),
            previews,
        }
    }
}
