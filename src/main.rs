//! Wavegate - Station Directory Gateway and Mission Control
//!
//! Discovers radio-directory API replicas via DNS SRV and serves station
//! search with failover, alongside health probing of an upstream operations
//! service.

mod config;
mod directory;
mod ops;
mod web;

use config::Config;
use directory::DirectoryClient;
use ops::Prober;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("wavegate=info".parse()?))
        .init();

    // Load and validate configuration
    let cfg = Config::load()?;
    tracing::info!("Starting Wavegate on port {}...", cfg.http_port);
    tracing::info!("Directory discovery via {}", cfg.directory_service);

    let directory = DirectoryClient::new(&cfg.directory_service, cfg.shuffle_policy);

    let prober = cfg
        .ops_base_url
        .clone()
        .map(|base| Arc::new(Prober::new(base, cfg.ops_admin_token.clone())));
    if prober.is_none() {
        tracing::warn!(
            "WAVEGATE_OPS_BASE_URL not set; operations routes will answer with errors"
        );
    }

    // Start web server
    let server = Server::new(cfg, directory, prober);
    server.start().await?;

    Ok(())
}
