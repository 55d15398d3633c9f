use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Router,
};
use blob_store::{DiskStorageConfig, S3Config};
use tempfile::TempDir;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{config::ServerConfig, routes::create_routes, service::Service};

pub const TEST_BUCKET: &str = "test-bucket";

/// Unsigned S3 look-alike addressed path-style: `/{bucket}/{*key}`.
#[derive(Clone, Default)]
pub struct FakeObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    reject_puts: Arc<AtomicBool>,
}

impl FakeObjectStore {
    pub fn reject_puts(&self, reject: bool) {
        self.reject_puts.store(reject, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn remove(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    async fn serve(&self) -> Result<String> {
        let app = Router::new()
            .route("/{bucket}/{*key}", put(put_object).get(get_object))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{}", addr))
    }
}

async fn put_object(
    State(store): State<FakeObjectStore>,
    Path((_bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> StatusCode {
    if store.reject_puts.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    store.objects.lock().unwrap().insert(key, body.to_vec());
    StatusCode::OK
}

async fn get_object(
    State(store): State<FakeObjectStore>,
    Path((_bucket, key)): Path<(String, String)>,
) -> Result<Vec<u8>, StatusCode> {
    store
        .objects
        .lock()
        .unwrap()
        .get(&key)
        .cloned()
        .ok_or(StatusCode::FORBIDDEN)
}

pub struct TestService {
    pub service: Service,
    pub object_store: FakeObjectStore,
    temp_dir: TempDir,
}

impl TestService {
    pub async fn new() -> Result<Self> {
        Self::with_api_tokens(vec![]).await
    }

    pub async fn with_api_tokens(api_tokens: Vec<String>) -> Result<Self> {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
        );

        let temp_dir = tempfile::tempdir()?;
        let object_store = FakeObjectStore::default();
        let endpoint = object_store.serve().await?;

        let cfg = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            state_store_path: temp_dir.path().join("state_store").display().to_string(),
            local_storage: DiskStorageConfig {
                path: temp_dir.path().join("blobs").display().to_string(),
            },
            s3: S3Config {
                bucket: TEST_BUCKET.to_string(),
                region: "eu-north-1".to_string(),
                endpoint: Some(endpoint),
            },
            api_tokens,
            ..Default::default()
        };
        cfg.validate()?;
        let srv = Service::new(cfg).await?;

        Ok(Self {
            service: srv,
            object_store,
            temp_dir,
        })
    }

    /// Root directory of the local backend.
    pub fn local_root(&self) -> PathBuf {
        self.temp_dir.path().join("blobs")
    }

    /// Serve the API on an ephemeral port and return its base URL.
    pub async fn serve_http(&self) -> Result<String> {
        let app = create_routes(
            self.service.route_state(),
            self.service.config.max_body_bytes,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{}", addr))
    }
}
