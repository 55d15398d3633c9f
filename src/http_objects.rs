use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_model::CREATED_AT_FORMAT;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::gateway::{BlobView, GatewayError};

#[derive(Debug)]
pub struct BlobGatewayAPIError {
    status_code: StatusCode,
    message: String,
}

impl BlobGatewayAPIError {
    pub fn new(status_code: StatusCode, message: &str) -> Self {
        Self {
            status_code,
            message: message.to_string(),
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(e: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: &str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub detail: String,
}

impl IntoResponse for BlobGatewayAPIError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!("API Error: {} - {}", self.status_code, self.message);
        } else {
            warn!("API Error: {} - {}", self.status_code, self.message);
        }
        (
            self.status_code,
            Json(ErrorDetail {
                detail: self.message,
            }),
        )
            .into_response()
    }
}

impl From<GatewayError> for BlobGatewayAPIError {
    fn from(e: GatewayError) -> Self {
        match &e {
            GatewayError::InvalidInput(_) => Self::bad_request("Invalid base64 data"),
            GatewayError::Conflict { .. } => Self::conflict("ID already exists"),
            GatewayError::NotFound { .. } => Self::not_found("Unknown id"),
            _ if e.is_backend_error() => Self::bad_gateway(&e.to_string()),
            _ => Self::internal_error(&e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlobIn {
    /// Caller chosen identifier, unique per backend.
    pub id: String,
    /// Base64 encoded payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlobOut {
    pub id: String,
    pub data: String,
    pub size: u64,
    /// UTC timestamp with second precision, e.g. `2024-01-02T03:04:05Z`.
    pub created_at: String,
}

impl From<BlobView> for BlobOut {
    fn from(view: BlobView) -> Self {
        Self {
            id: view.id,
            data: view.data,
            size: view.size,
            created_at: view.created_at.format(CREATED_AT_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub ok: bool,
    pub backends: Vec<String>,
    pub bucket: String,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use data_model::Backend;

    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = vec![
            (
                GatewayError::InvalidInput("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Conflict {
                    backend: Backend::Local,
                    id: "x".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                GatewayError::NotFound {
                    backend: Backend::Database,
                    id: "x".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::MissingObject {
                    backend: Backend::ObjectStore,
                    id: "x".to_string(),
                    locator: "x".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                GatewayError::Backend {
                    backend: Backend::ObjectStore,
                    source: blob_store::BlobError::Rejected {
                        status: 500,
                        body: String::new(),
                    },
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                GatewayError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(BlobGatewayAPIError::from(err).status_code, status);
        }
    }

    #[test]
    fn test_blob_out_timestamp_format() {
        let out = BlobOut::from(BlobView {
            id: "a/b/c".to_string(),
            data: "aGVsbG8=".to_string(),
            size: 5,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        });
        assert_eq!(out.created_at, "2024-01-02T03:04:05Z");
        assert_eq!(out.size, 5);
    }
}
