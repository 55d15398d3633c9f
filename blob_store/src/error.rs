//! Error types for blob store operations.

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Nothing is stored at the locator.
    #[error("blob not found: {locator}")]
    NotFound { locator: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The remote store could not be reached or the transfer broke off.
    #[error("network error: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// The remote store answered but refused the write.
    #[error("object store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid blob store configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("blob store error: {0}")]
    Other(#[from] anyhow::Error),
}

impl BlobError {
    pub fn not_found(locator: &str) -> Self {
        BlobError::NotFound {
            locator: locator.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound { .. })
    }
}
