//! Merge routes - assembling a dossier from a request body.

use axum::{Json, extract::State, response::Response};
use bytes::Bytes;
use dossier_core::AssembledPdf;
use std::sync::Arc;
use tracing::info;

use super::{MergeRequest, MergeResponse};
use crate::helpers::{Disposition, RouteResult, assembly_error, pdf_response};
use crate::preview_store::MergedEntry;
use crate::state::AppState;

async fn assemble(state: &AppState, request: &MergeRequest) -> RouteResult<AssembledPdf> {
    let files = request.files();
    state
        .assembler
        .assemble(&files, request.application_data.as_ref())
        .await
        .map_err(|e| assembly_error(&e))
}

/// Assemble and keep the result for the download and view routes.
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> RouteResult<Json<MergeResponse>> {
    let merged = assemble(&state, &request).await?;

    let entry = MergedEntry {
        filename: merged.filename.clone(),
        bytes: Bytes::from(merged.bytes),
        page_count: merged.page_count,
    };
    let id = state.previews.insert(entry).await;

    info!(
        "Stored {} as {} ({} pages, {} skipped)",
        merged.filename,
        id,
        merged.page_count,
        merged.report.skipped.len()
    );

    Ok(Json(MergeResponse {
        download_url: format!("/api/merged/{id}/download"),
        view_url: format!("/api/merged/{id}/view"),
        id: id.to_string(),
        filename: merged.filename,
        page_count: merged.page_count,
        skipped: merged.report.skipped,
    }))
}

/// Assemble and send the PDF straight back as an attachment.
pub async fn merge_download(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> RouteResult<Response> {
    let merged = assemble(&state, &request).await?;

    let entry = MergedEntry {
        filename: merged.filename,
        bytes: Bytes::from(merged.bytes),
        page_count: merged.page_count,
    };
    pdf_response(&entry, Disposition::Attachment)
}
