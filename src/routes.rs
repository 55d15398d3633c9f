use std::{collections::HashSet, str::FromStr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Path, Request, State},
    http::Method,
    middleware,
    routing::{get, post},
    Json,
    Router,
};
use data_model::Backend;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    gateway::Gateway,
    http_objects::{BlobGatewayAPIError, BlobIn, BlobOut, ErrorDetail, HealthStatus},
    middleware::require_bearer_token,
};

#[derive(OpenApi)]
#[openapi(
        paths(
            store_blob,
            get_blob,
            health,
        ),
        components(
            schemas(
                BlobIn,
                BlobOut,
                HealthStatus,
                ErrorDetail,
            )
        ),
        tags(
            (name = "blobgate", description = "Blob Gateway API")
        )
    )]
struct ApiDoc;

#[derive(Clone)]
pub struct RouteState {
    pub gateway: Arc<Gateway>,
    pub api_tokens: Arc<HashSet<String>>,
    pub bucket: String,
}

pub fn create_routes(route_state: RouteState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    let blob_routes = Router::new()
        .route("/v1/{backend}/blobs", post(store_blob))
        .route("/v1/{backend}/blobs/{*id}", get(get_blob))
        .route_layer(middleware::from_fn_with_state(
            route_state.clone(),
            require_bearer_token,
        ))
        .with_state(route_state.clone());

    Router::new()
        .route("/", get(index))
        .route("/health", get(health).with_state(route_state.clone()))
        .route("/docs/openapi.json", get(openapi))
        .merge(blob_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    let method = req.method();
                    let uri = req.uri();

                    let matched_path = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::debug_span!("request", %method, %uri, matched_path)
                })
                .on_failure(()),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn index() -> &'static str {
    "Blob Gateway"
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn parse_backend(backend: &str) -> Result<Backend, BlobGatewayAPIError> {
    Backend::from_str(backend)
        .map_err(|_| BlobGatewayAPIError::not_found(&format!("Unknown backend: {}", backend)))
}

/// Label reported by the health route. The object store is written without
/// request signing, the label says so.
fn health_label(backend: Backend) -> String {
    match backend {
        Backend::ObjectStore => "s3_unsigned".to_string(),
        other => other.to_string(),
    }
}

/// Store a blob
#[utoipa::path(
    post,
    path = "/v1/{backend}/blobs",
    request_body = BlobIn,
    tag = "blobgate",
    params(("backend" = String, Path, description = "local, db or s3")),
    responses(
        (status = 200, description = "Blob stored", body = BlobOut),
        (status = BAD_REQUEST, description = "Data is not valid base64", body = ErrorDetail),
        (status = NOT_FOUND, description = "Unknown backend", body = ErrorDetail),
        (status = CONFLICT, description = "Id already exists for this backend", body = ErrorDetail),
        (status = BAD_GATEWAY, description = "Backend failed to store the blob", body = ErrorDetail)
    ),
)]
async fn store_blob(
    State(state): State<RouteState>,
    Path(backend): Path<String>,
    Json(blob): Json<BlobIn>,
) -> Result<Json<BlobOut>, BlobGatewayAPIError> {
    let backend = parse_backend(&backend)?;
    let stored = state.gateway.store(backend, &blob.id, &blob.data).await?;
    Ok(Json(stored.into()))
}

/// Retrieve a blob
#[utoipa::path(
    get,
    path = "/v1/{backend}/blobs/{id}",
    tag = "blobgate",
    params(
        ("backend" = String, Path, description = "local, db or s3"),
        ("id" = String, Path, description = "Blob id, may contain slashes")
    ),
    responses(
        (status = 200, description = "Blob found", body = BlobOut),
        (status = NOT_FOUND, description = "Unknown backend or id", body = ErrorDetail),
        (status = BAD_GATEWAY, description = "Backend failed or object is missing", body = ErrorDetail)
    ),
)]
async fn get_blob(
    State(state): State<RouteState>,
    Path((backend, id)): Path<(String, String)>,
) -> Result<Json<BlobOut>, BlobGatewayAPIError> {
    let backend = parse_backend(&backend)?;
    let blob = state.gateway.retrieve(backend, &id).await?;
    Ok(Json(blob.into()))
}

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    tag = "blobgate",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    ),
)]
async fn health(State(state): State<RouteState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        ok: true,
        backends: state
            .gateway
            .backends()
            .into_iter()
            .map(health_label)
            .collect(),
        bucket: state.bucket.clone(),
    })
}
