//! Blob storage configuration.

use std::env;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{BlobError, BlobResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskStorageConfig {
    /// Root directory, every locator is relative to it.
    pub path: String,
}

impl Default for DiskStorageConfig {
    fn default() -> Self {
        DiskStorageConfig {
            path: default_disk_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Base URL of an S3 compatible store (MinIO, localstack). When set,
    /// objects are addressed path-style as `<endpoint>/<bucket>/<key>`
    /// instead of the virtual-hosted AWS URL.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        S3Config {
            bucket: "blobgate".to_string(),
            region: "eu-north-1".to_string(),
            endpoint: None,
        }
    }
}

impl S3Config {
    pub fn validate(&self) -> BlobResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(BlobError::InvalidConfig {
                reason: "s3 bucket must not be empty".to_string(),
            });
        }
        if self.region.trim().is_empty() {
            return Err(BlobError::InvalidConfig {
                reason: "s3 region must not be empty".to_string(),
            });
        }
        if let Some(endpoint) = &self.endpoint {
            let url = Url::parse(endpoint).map_err(|e| BlobError::InvalidConfig {
                reason: format!("invalid s3 endpoint {}: {}", endpoint, e),
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(BlobError::InvalidConfig {
                    reason: format!("unsupported s3 endpoint scheme: {}", url.scheme()),
                });
            }
        }
        Ok(())
    }
}

pub fn default_disk_storage_path() -> String {
    env::current_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join("blobgate_storage/blobs")
        .to_str()
        .unwrap_or("./blobgate_storage/blobs")
        .to_string()
}
