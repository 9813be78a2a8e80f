//! PDF Editor Web - HTTP API for merging PDFs and overlaying images and text.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use clap::Parser;
use pdf_editor_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::{AppState, SESSION_MAX_IDLE};

#[derive(Parser, Debug)]
#[command(name = "pdf-editor-web")]
#[command(author, version, about = "PDF Editor Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long, env = "PDF_EDITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Font directory or base URL (overrides config)
    #[arg(long, env = "PDF_EDITOR_FONT_BASE")]
    font_base: Option<String>,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "100")]
    max_upload_mb: usize,

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

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(path) = &args.config {
        AppConfig::from_file(path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(base) = args.font_base {
        config.fonts.base_url = base;
    }
    config.validate().context("Invalid configuration")?;
    info!("Fonts from {}", config.fonts.base_url);

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    // Spawn background task for session cleanup (runs every 5 minutes)
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let cleanup_interval = Duration::from_secs(5 * 60);
        loop {
            tokio::time::sleep(cleanup_interval).await;
            let removed = cleanup_state.cleanup_old_sessions(SESSION_MAX_IDLE).await;
            debug!("Session cleanup removed {} idle sessions", removed);
        }
    });

    let app = routes::router(state)
        // API responses describe live session state and must not be cached
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(args.max_upload_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
