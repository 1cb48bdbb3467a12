//! HTTP route handlers for the dossier web service.
//!
//! JSON in, JSON or PDF out. Merged PDFs are kept in the preview store for
//! a short while so the admin UI can both download and display them.

mod download;
mod merge;

pub use download::{delete_merged, download_merged, view_merged};
pub use merge::{merge, merge_download};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, header},
    routing::{delete, get, post},
};
use dossier_core::{ApplicationData, FileReference, SkippedFile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::state::AppState;

/// Request bodies are JSON metadata only; files are fetched by URL.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body of both merge routes. Without `files`, the profile's own
/// attachments are merged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    #[serde(default)]
    pub files: Option<Vec<FileReference>>,
    #[serde(default)]
    pub application_data: Option<ApplicationData>,
}

impl MergeRequest {
    pub fn files(&self) -> Vec<FileReference> {
        match (&self.files, &self.application_data) {
            (Some(files), _) => files.clone(),
            (None, Some(data)) => data.profile.file_references(),
            (None, None) => Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub id: String,
    pub filename: String,
    pub page_count: usize,
    pub download_url: String,
    pub view_url: String,
    pub skipped: Vec<SkippedFile>,
}

/// Liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "fetcher": state.assembler.fetcher_name(),
    }))
}

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/merge", post(merge))
        .route("/api/merge/download", post(merge_download))
        .route("/api/merged/{id}", delete(delete_merged))
        .route("/api/merged/{id}/download", get(download_merged))
        .route("/api/merged/{id}/view", get(view_merged))
        // Merged PDFs hold personal data; keep them out of shared caches
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
