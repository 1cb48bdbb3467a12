//! Download routes - serving and releasing stored merges.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::helpers::{Disposition, OptionExt, RouteResult, pdf_response};
use crate::state::AppState;

const NOT_FOUND: &str = "Merged PDF not found or expired";

/// Serve a stored merge as a download.
pub async fn download_merged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let entry = state.previews.get(&id).await.or_not_found(NOT_FOUND)?;
    pdf_response(&entry, Disposition::Attachment)
}

/// Serve a stored merge for display in the browser.
pub async fn view_merged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let entry = state.previews.get(&id).await.or_not_found(NOT_FOUND)?;
    pdf_response(&entry, Disposition::Inline)
}

/// Release a stored merge before it expires.
pub async fn delete_merged(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<StatusCode> {
    if state.previews.remove(&id).await {
        debug!("Released merge {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, NOT_FOUND.to_string()))
    }
}
