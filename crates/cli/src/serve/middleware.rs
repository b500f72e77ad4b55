//! HTTP middleware: API key authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use super::state::AppState;

/// API key authentication middleware.
///
/// If `TASKRIPPLE_API_KEY` is set, all requests (except /health) must include
/// either `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let expected_key = match &state.api_key {
        Some(k) => k,
        None => return next.run(request).await,
    };

    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    let presented = bearer.or(header_key).map(|key| key == expected_key.as_str());
    match presented {
        Some(true) => next.run(request).await,
        Some(false) => super::json_error(StatusCode::FORBIDDEN, "invalid_api_key", "invalid API key"),
        None => super::json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_required",
            "authentication required",
        ),
    }
}
