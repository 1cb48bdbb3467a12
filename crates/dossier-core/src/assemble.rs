//! The merge assembler: cover, grouped images and PDFs spliced into one
//! output document.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::classify::{self, FileKind, PlanItem};
use crate::config::AppConfig;
use crate::cover::{CoverPageRenderer, load_picture};
use crate::error::{Error, Result};
use crate::fetch::{ResourceFetcher, create_config_fetcher, create_fetcher};
use crate::font_loader::load_font;
use crate::image_page::PageRenderer;
use crate::model::{ApplicationData, FileReference};
use crate::pdf::{EmbeddedFont, MergedDocument, open_pdf};
use crate::text::contains_bengali;
use crate::util::{last_chars, run_blocking};

/// Filename used when no application data is available.
pub const FALLBACK_FILENAME: &str = "application.pdf";

/// Progress callback, called with `(done, total)` after each body item.
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// A finished merge.
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    /// Suggested download filename.
    pub filename: String,
    pub page_count: usize,
    pub report: AssemblyReport,
}

/// What went into the output and what was left out.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReport {
    /// Pages produced from application data (0 without it).
    pub cover_pages: usize,
    pub included: Vec<IncludedFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedFile {
    pub label: String,
    pub url: String,
    /// 1-based output page where the file starts.
    pub first_page: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub label: String,
    pub url: String,
    pub reason: String,
}

impl AssemblyReport {
    fn include(&mut self, file: &FileReference, first_page: usize) {
        self.included.push(IncludedFile {
            label: file.label.clone(),
            url: file.url.clone(),
            first_page,
        });
    }

    fn skip(&mut self, file: &FileReference, reason: impl ToString) {
        self.skipped.push(SkippedFile {
            label: file.label.clone(),
            url: file.url.clone(),
            reason: reason.to_string(),
        });
    }
}

/// Merges application files into one PDF.
///
/// Holds the fetchers and configuration; the Bengali font is fetched the
/// first time it is needed and kept for later merges.
pub struct DossierAssembler {
    /// Fetches the files and profile picture named by a request.
    fetcher: Arc<dyn ResourceFetcher>,
    /// Fetches the configured font, which may live on local disk.
    font_fetcher: Arc<dyn ResourceFetcher>,
    config: AppConfig,
    font: OnceCell<Arc<EmbeddedFont>>,
}

impl DossierAssembler {
    /// Create an assembler fetching over HTTP, and from the local filesystem
    /// when `fetch.allow_local` is set.
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = create_fetcher(&config.fetch)?;
        let font_fetcher = create_config_fetcher(&config.fetch)?;
        Ok(Self {
            fetcher,
            font_fetcher,
            config,
            font: OnceCell::new(),
        })
    }

    /// Create with a custom fetcher, used for the font too
    pub fn with_fetcher(fetcher: Arc<dyn ResourceFetcher>, config: AppConfig) -> Self {
        Self {
            font_fetcher: Arc::clone(&fetcher),
            fetcher,
            config,
            font: OnceCell::new(),
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Merge `files` (and a cover for `data`, when given) into one PDF.
    pub async fn assemble(
        &self,
        files: &[FileReference],
        data: Option<&ApplicationData>,
    ) -> Result<AssembledPdf> {
        self.assemble_with_progress(files, data, None).await
    }

    /// As [`assemble`](Self::assemble), reporting progress per body item.
    ///
    /// Fetching runs on the async executor; decoding, page rendering,
    /// splicing and serialization run on the blocking pool.
    pub async fn assemble_with_progress(
        &self,
        files: &[FileReference],
        data: Option<&ApplicationData>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<AssembledPdf> {
        if files.is_empty() && data.is_none() {
            return Err(Error::NothingToAssemble);
        }

        info!(
            "Assembling {} file(s){} with {}",
            files.len(),
            if data.is_some() { " and a cover" } else { "" },
            self.fetcher.name()
        );

        let needs_font = data.is_some() || files.iter().any(|f| contains_bengali(&f.label));
        let font = if needs_font { self.font().await } else { None };

        let mut assembly = Assembly::default();

        let picture_url = data.and_then(|d| d.profile.profile_picture_url());

        if let Some(data) = data {
            let picture = match picture_url {
                Some(url) => load_picture(self.fetcher.as_ref(), url).await,
                None => None,
            };
            let layout = self.config.layout.clone();
            let data = data.clone();
            let cover_font = font.clone();
            assembly = run_blocking(move || {
                let cover = CoverPageRenderer::new(&layout, cover_font.as_deref()).render(&data, picture)?;
                assembly.report.cover_pages = assembly.output.splice(cover);
                Ok(assembly)
            })
            .await?;
            debug!("Cover: {} page(s)", assembly.report.cover_pages);
        }

        // The profile picture is already on the cover
        let body: Vec<FileReference> = files
            .iter()
            .filter(|f| picture_url.is_none_or(|url| f.url != url))
            .cloned()
            .collect();

        for file in body.iter().filter(|f| FileKind::of(&f.url).is_none()) {
            warn!("Skipping '{}' ({}): unrecognised file type", file.display_label(), file.url);
            assembly.report.skip(file, "unrecognised file type");
        }

        let plan = classify::plan(&body);
        let total = plan.len();
        let page_size = self.config.layout.page_size;

        // Fetches run ahead by up to `concurrency` items; rendering and
        // splicing consume them strictly in plan order.
        let plan = &plan;
        let mut fetched = stream::iter(0..plan.len())
            .map(|i| async move {
                let item = &plan[i];
                (item, self.fetch_all(item.urls()).await)
            })
            .buffered(self.config.fetch.concurrency.max(1));

        let mut done = 0;
        while let Some((item, results)) = fetched.next().await {
            let item = item.clone();
            let font = font.clone();
            assembly = run_blocking(move || {
                let renderer = PageRenderer::new(page_size, font.as_deref());
                assembly.splice_item(&item, results, &renderer)?;
                Ok(assembly)
            })
            .await?;

            done += 1;
            if let Some(callback) = progress {
                callback(done, total);
            }
        }

        let Assembly { output, report } = assembly;
        if output.is_empty() {
            return Err(Error::NothingToAssemble);
        }

        let page_count = output.page_count();
        let bytes = run_blocking(move || output.into_bytes()).await?;
        let filename = download_filename(data);

        info!(
            "Assembled {} ({} pages, {} bytes), {} file(s) skipped",
            filename,
            page_count,
            bytes.len(),
            report.skipped.len()
        );

        Ok(AssembledPdf {
            bytes,
            filename,
            page_count,
            report,
        })
    }

    /// The Bengali font, loading it on first use. A failed load is retried
    /// by the next merge.
    async fn font(&self) -> Option<Arc<EmbeddedFont>> {
        self.font
            .get_or_try_init(|| async {
                load_font(self.font_fetcher.as_ref(), &self.config.font)
                    .await
                    .map(Arc::new)
                    .ok_or(())
            })
            .await
            .ok()
            .cloned()
    }

    /// Fetch `urls` one after another.
    async fn fetch_all(&self, urls: Vec<&str>) -> Vec<Result<Vec<u8>>> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.fetcher.fetch(url).await);
        }
        results
    }
}

/// The output document under construction and its report. Moved onto the
/// blocking pool for each render step and handed back.
#[derive(Default)]
struct Assembly {
    output: MergedDocument,
    report: AssemblyReport,
}

impl Assembly {
    /// Render one plan item from its fetched bytes and append it.
    ///
    /// Per-file failures go to the report; only page construction errors
    /// return.
    fn splice_item(
        &mut self,
        item: &PlanItem,
        results: Vec<Result<Vec<u8>>>,
        renderer: &PageRenderer<'_>,
    ) -> Result<()> {
        match item {
            PlanItem::Images { title, members } => {
                let mut loaded = Vec::with_capacity(members.len());
                for (member, result) in members.iter().zip(results) {
                    match result {
                        Ok(bytes) => loaded.push((member.clone(), bytes)),
                        Err(e) => {
                            warn!("Skipping '{}' ({}): {}", member.file.display_label(), member.file.url, e);
                            self.report.skip(&member.file, e);
                        }
                    }
                }
                if loaded.is_empty() {
                    return Ok(());
                }

                let page = renderer.image_page(*title, loaded, members.len())?;
                for (file, e) in &page.failed {
                    self.report.skip(file, e);
                }
                if let Some(document) = page.document {
                    let first_page = self.output.page_count() + 1;
                    self.output.splice(document);
                    for file in &page.included {
                        self.report.include(file, first_page);
                    }
                }
            }
            PlanItem::Pdf(file) => {
                let Some(result) = results.into_iter().next() else {
                    return Ok(());
                };

                match result.and_then(|bytes| open_pdf(&bytes, &file.url)) {
                    Ok(source) => {
                        // Label page only once the document is known to be usable
                        let first_page = self.output.page_count() + 1;
                        self.output.splice(renderer.label_page(file.display_label())?);
                        let pages = self.output.splice(source);
                        debug!("Spliced {} page(s) from {}", pages, file.url);
                        self.report.include(file, first_page);
                    }
                    Err(e) => {
                        warn!("Skipping '{}' ({}): {}", file.display_label(), file.url, e);
                        self.report.skip(file, e);
                    }
                }
            }
        }
        Ok(())
    }
}

/// `"<full name>-<last 4 of application id>.pdf"`, or
/// [`FALLBACK_FILENAME`] without application data.
pub fn download_filename(data: Option<&ApplicationData>) -> String {
    let Some(data) = data else {
        return FALLBACK_FILENAME.to_string();
    };

    let name = data
        .profile
        .full_name()
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "application".to_string());

    match data.application.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => format!("{name}-{}.pdf", last_chars(id, 4)),
        _ => format!("{name}.pdf"),
    }
}

/// Replace characters that are unsafe in a filename or header value.
fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
