use anyhow::{anyhow, Result};
use chrono::{DateTime, SubsecRound, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Wire format used for `created_at` in API responses.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The storage destinations a blob can be written to.
///
/// The string form is used in routes, index keys and logs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Backend {
    #[serde(rename = "local")]
    #[strum(serialize = "local")]
    Local,
    #[serde(rename = "db")]
    #[strum(serialize = "db")]
    Database,
    #[serde(rename = "s3")]
    #[strum(serialize = "s3")]
    ObjectStore,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Builder)]
#[builder(build_fn(skip))]
pub struct BlobMetadata {
    pub backend: Backend,
    pub id: String,
    /// Backend specific address of the payload, only meaningful to the
    /// adapter that produced it.
    pub locator: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl BlobMetadata {
    pub fn key(&self) -> String {
        BlobMetadata::key_from(self.backend, &self.id)
    }

    pub fn key_from(backend: Backend, id: &str) -> String {
        format!("{}|{}", backend, id)
    }

    pub fn created_at_str(&self) -> String {
        self.created_at.format(CREATED_AT_FORMAT).to_string()
    }
}

impl BlobMetadataBuilder {
    pub fn build(&mut self) -> Result<BlobMetadata> {
        let backend = self.backend.ok_or(anyhow!("backend is required"))?;
        let id = self.id.clone().ok_or(anyhow!("id is required"))?;
        let locator = self.locator.clone().ok_or(anyhow!("locator is required"))?;
        let size = self.size.ok_or(anyhow!("size is required"))?;
        // responses carry second precision, keep the stored value consistent
        let created_at = self
            .created_at
            .unwrap_or_else(Utc::now)
            .trunc_subsecs(0);
        Ok(BlobMetadata {
            backend,
            id,
            locator,
            size,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_backend_names() {
        let names: Vec<String> = Backend::iter().map(|b| b.to_string()).collect();
        assert_eq!(names, vec!["local", "db", "s3"]);
        assert_eq!(Backend::from_str("db").unwrap(), Backend::Database);
        assert!(Backend::from_str("gcs").is_err());
        assert_eq!(
            serde_json::to_string(&Backend::ObjectStore).unwrap(),
            "\"s3\""
        );
    }

    #[test]
    fn test_metadata_builder() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let meta = BlobMetadataBuilder::default()
            .backend(Backend::Local)
            .id("a/b/../c".to_string())
            .locator("a/b/c".to_string())
            .size(5)
            .created_at(created_at)
            .build()
            .unwrap();
        assert_eq!(meta.key(), "local|a/b/../c");
        assert_eq!(meta.created_at_str(), "2024-03-09T07:05:01Z");

        let err = BlobMetadataBuilder::default()
            .backend(Backend::Local)
            .id("x".to_string())
            .size(1)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_metadata_builder_truncates_to_seconds() {
        let meta = BlobMetadataBuilder::default()
            .backend(Backend::Database)
            .id("x".to_string())
            .locator("x".to_string())
            .size(0)
            .build()
            .unwrap();
        assert_eq!(meta.created_at.timestamp_subsec_nanos(), 0);
    }
}
