//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use tracing::error;

use crate::preview_store::MergedEntry;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

/// Map an assembly failure to a response.
///
/// An empty request is the caller's fault (422); anything else means the
/// output document could not be built.
pub fn assembly_error(e: &dossier_core::Error) -> (StatusCode, String) {
    match e {
        dossier_core::Error::NothingToAssemble => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        _ => {
            error!("Assembly failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to assemble PDF: {e}"))
        }
    }
}

/// How the browser should treat a served PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// `Content-Disposition` value carrying an ASCII fallback name and the
/// UTF-8 name (applicant names are often Bengali).
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        fallback,
        urlencoding::encode(filename)
    )
}

/// Serve a merged PDF.
pub fn pdf_response(entry: &MergedEntry, disposition: Disposition) -> RouteResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &entry.filename),
        )
        .header(header::CONTENT_LENGTH, entry.bytes.len())
        .body(Body::from(entry.bytes.clone()))
        .or_internal_error()
}
