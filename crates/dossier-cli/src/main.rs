//! Dossier CLI - Command line tool for assembling application dossier PDFs.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dossier_core::{AppConfig, ApplicationData, DossierAssembler, FileReference, PageSize};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageSizeOption {
    A4,
    Letter,
}

impl From<PageSizeOption> for PageSize {
    fn from(opt: PageSizeOption) -> Self {
        match opt {
            PageSizeOption::A4 => Self::A4,
            PageSizeOption::Letter => Self::Letter,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dossier")]
#[command(author, version, about = "Merge an application's files into one PDF", long_about = None)]
struct Args {
    /// JSON manifest: { "files": [{label, url}], "applicationData": {...} }
    #[arg(required = true)]
    manifest: PathBuf,

    /// Output PDF file (default: "<name>-<id>.pdf" in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for root-relative URLs such as the font path
    #[arg(long, env = "DOSSIER_BASE_URL")]
    base_url: Option<String>,

    /// Bengali font location (URL or local path)
    #[arg(long, env = "DOSSIER_FONT")]
    font: Option<String>,

    /// Number of files fetched ahead of rendering
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Per-file fetch timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Page size for generated pages
    #[arg(long, value_enum)]
    page_size: Option<PageSizeOption>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// The input file. Without `files`, the profile's own attachments are used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    files: Option<Vec<FileReference>>,
    #[serde(default)]
    application_data: Option<ApplicationData>,
}

impl Manifest {
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    fn files(&self) -> Vec<FileReference> {
        match (&self.files, &self.application_data) {
            (Some(files), _) => files.clone(),
            (None, Some(data)) => data.profile.file_references(),
            (None, None) => Vec::new(),
        }
    }
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    // Manifests name files on this machine
    config.fetch.allow_local = true;
    if let Some(base_url) = &args.base_url {
        config.fetch.base_url = Some(base_url.clone());
    }
    if let Some(font) = &args.font {
        config.font.url.clone_from(font);
    }
    if let Some(concurrency) = args.concurrency {
        config.fetch.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(page_size) = args.page_size {
        config.layout.page_size = page_size.into();
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let manifest = Manifest::from_file(&args.manifest)?;
    let files = manifest.files();
    let data = manifest.application_data.as_ref();
    info!(
        "Manifest lists {} file(s){}",
        files.len(),
        if data.is_some() { " with application data" } else { "" }
    );

    let assembler = DossierAssembler::new(config).context("Failed to initialize assembler")?;

    // Setup progress bar
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    let merged = assembler
        .assemble_with_progress(&files, data, Some(&progress))
        .await
        .context("Failed to assemble PDF")?;

    pb.finish_and_clear();

    for skipped in &merged.report.skipped {
        pb.println(format!("Skipped {} ({}): {}", skipped.label, skipped.url, skipped.reason));
    }

    let output_path = args.output.unwrap_or_else(|| PathBuf::from(&merged.filename));

    std::fs::write(&output_path, &merged.bytes)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Merged PDF ({} pages) saved to: {}",
            merged.page_count,
            output_path.display()
        );
    }

    Ok(())
}
