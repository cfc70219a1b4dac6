use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::AppState;
use crate::error::ApiError;

/// Middleware: authenticates `/api/v1` requests against the configured
/// bearer token. Without a configured token every request is refused.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Err(ApiError::Disabled);
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if token != expected {
        warn!("Invalid Bearer token provided for {}", req.uri().path());
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}
