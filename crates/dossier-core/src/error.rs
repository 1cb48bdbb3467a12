use thiserror::Error;

/// Unified error type for dossier-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Resource fetching (HTTP status, transport, timeouts, local files)
/// - Font loading and parsing
/// - Image decoding
/// - PDF construction, splicing and serialization
/// - Configuration loading
///
/// Per-file variants are normally caught by the assembler and recorded in the
/// assembly report; only document-level failures reach the caller.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Fetch Errors
    // ==========================================================================
    /// Remote resource answered with a non-success status
    #[error("fetching {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// Network or protocol failure while fetching a resource
    #[error("fetching {url} failed: {reason}")]
    FetchTransport { url: String, reason: String },

    /// Resource fetch exceeded the configured timeout
    #[error("fetching {url} timed out")]
    FetchTimeout { url: String },

    /// Local file referenced by a path or file:// URL could not be read
    #[error("reading {path} failed: {reason}")]
    FetchLocal { path: String, reason: String },

    /// Reference points at the local filesystem and local reads are off
    #[error("{url} is not an http(s) URL and local reads are disabled")]
    FetchLocalDisabled { url: String },

    // ==========================================================================
    // Font Errors
    // ==========================================================================
    /// Font bytes could not be parsed as TrueType/OpenType
    #[error("failed to parse font: {0}")]
    FontParse(String),

    // ==========================================================================
    // Image Errors
    // ==========================================================================
    /// Image bytes could not be decoded
    #[error("failed to decode image {source_url}: {reason}")]
    ImageDecode { source_url: String, reason: String },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a source PDF
    #[error("failed to open PDF {source_url}: {reason}")]
    PdfOpen { source_url: String, reason: String },

    /// Source PDF parsed but contains no pages
    #[error("PDF {0} has no pages")]
    PdfEmpty(String),

    /// Failed to build a generated page
    #[error("failed to build page: {0}")]
    PdfBuild(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Assembly Errors
    // ==========================================================================
    /// Neither a cover page nor any body page could be produced
    #[error("nothing to assemble: no application data and no usable files")]
    NothingToAssemble,

    /// A rendering task on the blocking pool panicked or was cancelled
    #[error("rendering task failed: {0}")]
    RenderTask(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is isolated to a single input file.
    ///
    /// The assembler skips the offending file for these and keeps going.
    pub const fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::FetchStatus { .. }
                | Self::FetchTransport { .. }
                | Self::FetchTimeout { .. }
                | Self::FetchLocal { .. }
                | Self::FetchLocalDisabled { .. }
                | Self::ImageDecode { .. }
                | Self::PdfOpen { .. }
                | Self::PdfEmpty(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Self::Lopdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let not_found = Error::FetchStatus {
            url: "https://cdn.example/nid.jpg".to_string(),
            status: 404,
        };
        assert!(not_found.is_per_file());
        assert!(not_found.to_string().contains("404"));

        assert!(!Error::PdfSave("disk full".to_string()).is_per_file());
        assert!(!Error::NothingToAssemble.is_per_file());
    }
}
