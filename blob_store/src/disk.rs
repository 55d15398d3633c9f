use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use data_model::Backend;
use nanoid::nanoid;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::{sanitize, BlobError, BlobResult, BlobStore, DiskStorageConfig};

/// Stores blobs as files under a fixed root directory.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    #[tracing::instrument]
    pub fn new(config: DiskStorageConfig) -> BlobResult<Self> {
        std::fs::create_dir_all(&config.path)?;
        Ok(Self {
            root: PathBuf::from(config.path),
        })
    }

    fn resolve(&self, key: &str) -> (String, PathBuf) {
        let segments = sanitize(key);
        let mut path = self.root.clone();
        path.extend(segments.iter());
        (segments.join("/"), path)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(crate::sanitize::FALLBACK_SEGMENT);
    path.with_file_name(format!(".{}.{}.part", name, nanoid!(8)))
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl BlobStore for DiskStorage {
    fn kind(&self) -> Backend {
        Backend::Local
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> BlobResult<String> {
        let (locator, path) = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // readers only ever see a complete file, the rename is atomic
        let tmp = temp_sibling(&path);
        if let Err(e) = write_file(&tmp, &data).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(tmp = %tmp.display(), "failed to remove temp file: {}", cleanup);
            }
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(locator = %locator, "stored blob on disk");
        Ok(locator)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, locator: &str) -> BlobResult<Bytes> {
        let (_, path) = self.resolve(locator);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::not_found(locator))
            }
            Err(e) => Err(BlobError::Io { source: e }),
        }
    }
}
