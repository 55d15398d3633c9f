use async_trait::async_trait;
use bytes::Bytes;
use data_model::Backend;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::{sanitize_to_path, BlobError, BlobResult, BlobStore, S3Config};

/// Unsigned access to an S3 style object store.
///
/// Requests carry no credentials, the bucket policy has to allow anonymous
/// `PutObject`/`GetObject`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: reqwest::Client,
    config: S3Config,
}

impl S3Storage {
    pub fn new(config: S3Config) -> BlobResult<Self> {
        config.validate()?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    pub fn object_url(&self, object_key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket,
                object_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket, self.config.region, object_key
            ),
        }
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    fn kind(&self) -> Backend {
        Backend::ObjectStore
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> BlobResult<String> {
        let object_key = sanitize_to_path(key);
        let url = self.object_url(&object_key);
        let response = self.client.put(&url).body(data).send().await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "object store rejected put");
            return Err(BlobError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(object_key = %object_key, "stored blob in object store");
        Ok(object_key)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, locator: &str) -> BlobResult<Bytes> {
        let object_key = sanitize_to_path(locator);
        let url = self.object_url(&object_key);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        // a missing object and a denied read look the same to an anonymous client
        if status != StatusCode::OK {
            debug!(url = %url, status = status.as_u16(), "object store get failed");
            return Err(BlobError::not_found(locator));
        }
        Ok(response.bytes().await?)
    }
}
