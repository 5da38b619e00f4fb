//! Reel Uploadr - video upload service

use clap::Parser;
use reel_uploadr::metrics::server::MetricsServer;
use reel_uploadr::{config::Config, logging, server::Server};
use std::path::PathBuf;
use tracing::info;

/// Reel Uploadr - probe, fast-start remux and store uploaded videos
#[derive(Parser, Debug)]
#[command(name = "reel-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level or filter directive; overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    logging::init(&config.logging, args.log_level.as_deref())?;

    info!(version = reel_uploadr::VERSION, config = ?args.config, "Starting Reel Uploadr");

    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::from_config(&config.metrics);
        server.start().await?;
        Some(server)
    } else {
        None
    };

    let result = Server::new(config).run().await;

    if let Some(server) = metrics_server.as_mut() {
        server.shutdown().await;
    }

    result?;
    Ok(())
}
