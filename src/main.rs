//! Tubely Ingest - video upload and fast-start ingestion service

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tubely_ingest::metrics::server::MetricsServer;
use tubely_ingest::{config::Config, server::Server};

/// Tubely Ingest - MP4 upload, fast-start remux and S3 storage
#[derive(Parser, Debug)]
#[command(name = "tubely-ingest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting Tubely Ingest v{}", tubely_ingest::VERSION);

    let config = Config::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    info!("Loaded configuration from {:?}", args.config);
    let config = Arc::new(config);

    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::from_config(&config.metrics);
        server.start().await.context("starting metrics server")?;
        Some(server)
    } else {
        None
    };

    let state = tubely_ingest::build_state(Arc::clone(&config))
        .await
        .context("building application state")?;

    let server = Server::bind(Arc::new(state)).await?;
    server.run().await?;

    if let Some(server) = metrics_server.as_mut() {
        server.shutdown().await;
    }

    Ok(())
}
