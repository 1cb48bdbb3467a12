//! Short-lived storage for merged PDFs awaiting download or preview.
//!
//! Entries expire after the configured time-to-live, so a client that
//! never comes back does not pin memory.

use bytes::Bytes;
use dossier_core::PreviewConfig;
use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

/// A merged PDF held for the download and view routes.
#[derive(Debug, Clone)]
pub struct MergedEntry {
    pub filename: String,
    pub bytes: Bytes,
    pub page_count: usize,
}

pub struct PreviewStore {
    cache: Cache<Uuid, MergedEntry>,
}

impl PreviewStore {
    pub fn new(config: &PreviewConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self { cache }
    }

    /// Store an entry under a fresh id.
    pub async fn insert(&self, entry: MergedEntry) -> Uuid {
        let id = Uuid::new_v4();
        self.cache.insert(id, entry).await;
        id
    }

    /// Look up an entry. Malformed ids are simply not found.
    pub async fn get(&self, id: &str) -> Option<MergedEntry> {
        let id = Uuid::parse_str(id).ok()?;
        self.cache.get(&id).await
    }

    /// Release an entry early. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let Ok(id) = Uuid::parse_str(id) else {
            return false;
        };
        self.cache.remove(&id).await.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry() -> MergedEntry {
        MergedEntry {
            filename: "a.pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.5"),
            page_count: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = PreviewStore::new(&PreviewConfig::default());
        let id = store.insert(entry()).await.to_string();

        assert_eq!(store.get(&id).await.unwrap().filename, "a.pdf");
        assert!(store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.remove(&id).await);
    }

    #[tokio::test]
    async fn test_malformed_id() {
        let store = PreviewStore::new(&PreviewConfig::default());
        assert!(store.get("not-a-uuid").await.is_none());
        assert!(!store.remove("../etc/passwd").await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = PreviewStore::new(&PreviewConfig {
            ttl_seconds: 1,
            ..Default::default()
        });
        let id = store.insert(entry()).await.to_string();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(store.get(&id).await.is_none());
    }
}
