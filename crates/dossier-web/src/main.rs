//! Dossier Web - HTTP service assembling application dossier PDFs.

mod helpers;
mod preview_store;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use dossier_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "dossier-web")]
#[command(author, version, about = "Dossier PDF merge server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for root-relative URLs such as the font path
    #[arg(long, env = "DOSSIER_BASE_URL")]
    base_url: Option<String>,

    /// Bengali font location (URL or local path)
    #[arg(long, env = "DOSSIER_FONT")]
    font: Option<String>,

    /// Seconds a merged PDF stays available for download
    #[arg(long, env = "DOSSIER_PREVIEW_TTL")]
    preview_ttl: Option<u64>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(base_url) = args.base_url {
        config.fetch.base_url = Some(base_url);
    }
    if let Some(font) = args.font {
        config.font.url = font;
    }
    if let Some(ttl) = args.preview_ttl {
        config.preview.ttl_seconds = ttl;
    }
    config.validate().context("Invalid configuration")?;
    if config.fetch.allow_local {
        warn!("fetch.allow_local is set: merge requests can read files from this server's disk");
    }

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
