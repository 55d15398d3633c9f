use std::path::PathBuf;

use ::tracing::{error, info_span};
use anyhow::{Context, Result};
use clap::Parser;
use service::Service;

mod config;
mod gateway;
mod http_objects;
mod middleware;
mod routes;
mod service;
mod tracing;
use tracing::setup_tracing;

#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => config::ServerConfig::from_path(&path.to_string_lossy())
            .with_context(|| format!("error loading config from {}", path.display()))?,
        None => config::ServerConfig::default(),
    };

    setup_tracing(&config).inspect_err(|e| {
        error!("Error setting up tracing: {:?}", e);
    })?;

    let root_span = info_span!("blobgate", listen_addr = %config.listen_addr);
    let _guard = root_span.enter();

    let mut service = Service::new(config).await.inspect_err(|err| {
        error!("Error creating service: {:?}", err);
    })?;
    if let Err(err) = service.start().await {
        error!("Error starting service: {:?}", err);
    }
    service.shutdown();
    Ok(())
}
