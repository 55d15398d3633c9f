use std::{collections::HashSet, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum_server::Handle;
use blob_store::{DiskStorage, S3Storage};
use state_store::{BlobState, DatabaseStorage};
use tokio::{self, signal};
use tracing::info;

use super::routes::RouteState;
use crate::{config::ServerConfig, gateway::Gateway, routes::create_routes};

pub struct Service {
    pub config: ServerConfig,
    pub blob_state: Arc<BlobState>,
    pub gateway: Arc<Gateway>,
}

impl Service {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let blob_state = BlobState::open(PathBuf::from(&config.state_store_path))
            .context("error initializing state store")?;

        let local_storage = Arc::new(
            DiskStorage::new(config.local_storage.clone())
                .context("error initializing local blob storage")?,
        );
        let database_storage = Arc::new(DatabaseStorage::new(blob_state.clone()));
        let object_storage = Arc::new(
            S3Storage::new(config.s3.clone()).context("error initializing object storage")?,
        );

        let gateway = Arc::new(
            Gateway::new(blob_state.clone())
                .with_backend(local_storage)
                .with_backend(database_storage)
                .with_backend(object_storage),
        );

        Ok(Self {
            config,
            blob_state,
            gateway,
        })
    }

    pub fn route_state(&self) -> RouteState {
        RouteState {
            gateway: self.gateway.clone(),
            api_tokens: Arc::new(self.config.api_tokens.iter().cloned().collect::<HashSet<_>>()),
            bucket: self.config.s3.bucket.clone(),
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        let handle = Handle::new();
        let handle_sh = handle.clone();
        tokio::spawn(async move {
            shutdown_signal(handle_sh).await;
            info!("graceful shutdown signal received, shutting down server gracefully");
        });

        let addr: SocketAddr = self.config.listen_addr.parse()?;
        info!(
            "server api listening on {}, auth {}",
            self.config.listen_addr,
            if self.config.api_tokens.is_empty() {
                "disabled"
            } else {
                "enabled"
            }
        );
        let routes = create_routes(self.route_state(), self.config.max_body_bytes);
        axum_server::bind(addr)
            .handle(handle)
            .serve(routes.into_make_service())
            .await?;

        Ok(())
    }

    /// Release the state store once the server stopped serving. Returns true
    /// if the database was closed.
    pub fn shutdown(self) -> bool {
        let Service {
            blob_state,
            gateway,
            ..
        } = self;
        drop(gateway);
        blob_state.close()
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
        },
        _ = terminate => {
        },
    }
    handle.graceful_shutdown(None);
    info!("signal received, shutting down server gracefully");
}
