use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{http_objects::BlobGatewayAPIError, routes::RouteState};

/// Rejects requests without a configured bearer token. A missing or malformed
/// `Authorization` header is a 401, an unknown token a 403. Passes everything
/// through when no tokens are configured.
pub async fn require_bearer_token(
    State(state): State<RouteState>,
    request: Request,
    next: Next,
) -> Result<Response, BlobGatewayAPIError> {
    authorize(&state, request.headers())?;
    Ok(next.run(request).await)
}

fn authorize(state: &RouteState, headers: &HeaderMap) -> Result<(), BlobGatewayAPIError> {
    if state.api_tokens.is_empty() {
        return Ok(());
    }
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            BlobGatewayAPIError::unauthorized("Missing or invalid Authorization header")
        })?;
    if !state.api_tokens.contains(token) {
        return Err(BlobGatewayAPIError::forbidden("Invalid token"));
    }
    Ok(())
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}
