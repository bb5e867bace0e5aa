use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use openimg::cache::build_cache;
use openimg::config::Config;
use openimg::coordinator::ImageService;
use openimg::fetch::HttpFetcher;
use openimg::image_optimizer::StandardCodec;
use openimg::metrics::ServiceMetrics;
use openimg::server::{self, AppState};

/// openimg - on-demand image transformation proxy
#[derive(Parser, Debug)]
#[command(name = "openimg")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    address: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    openimg::logging::init_subscriber(args.json_logs)
        .map_err(|e| anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        cache_backend = ?config.cache.backend,
        coalescing = config.coalescing.enabled,
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test successful");
        return Ok(());
    }

    let cache = build_cache(&config.cache)
        .await
        .context("Failed to initialize cache")?;
    let fetcher = HttpFetcher::new(&config.fetch, config.image.max_source_bytes)
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let metrics = ServiceMetrics::new().context("Failed to register metrics")?;

    let service = ImageService::new(
        cache,
        Arc::new(fetcher),
        Arc::new(StandardCodec::new()),
        Arc::new(metrics),
    )
    .with_default_quality(config.image.default_quality)
    .with_coalescing(config.coalescing.enabled);

    let listen_addr = config.server.bind_address();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;

    tracing::info!(address = %listen_addr, "Starting openimg");

    let state = Arc::new(AppState::new(Arc::new(service)));
    server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await
    .context("Server error")?;

    tracing::info!("openimg stopped");
    Ok(())
}
