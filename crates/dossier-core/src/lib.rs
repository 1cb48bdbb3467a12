//! Dossier Core Library
//!
//! Assembles an applicant's uploaded files into one downloadable PDF:
//! - a generated cover page summarizing the application and profile
//! - identity-document images grouped and paired front/back
//! - other images one per page, PDFs behind a generated label page
//! - Latin and Bengali text, with per-file failures skipped rather than fatal

pub mod assemble;
pub mod classify;
pub mod config;
pub mod cover;
pub mod error;
pub mod fetch;
pub mod font_loader;
pub mod image_page;
pub mod model;
pub mod pdf;
pub mod text;
pub mod util;

pub use assemble::{
    AssembledPdf, AssemblyReport, DossierAssembler, FALLBACK_FILENAME, IncludedFile,
    ProgressCallback, SkippedFile, download_filename,
};
pub use classify::{FileKind, ImageMember, PlanItem, Side, plan};
pub use config::{AppConfig, FetchConfig, FontConfig, LayoutConfig, PageSize, PreviewConfig, TextColor};
pub use cover::CoverPageRenderer;
pub use error::{Error, Result};
pub use fetch::{HttpFetcher, MemoryFetcher, ResourceFetcher, create_config_fetcher, create_fetcher};
pub use font_loader::load_font;
pub use model::{ApplicationData, ApplicationStatus, FileReference, ProfileRecord};
pub use pdf::{EmbeddedFont, MergedDocument};
