use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

use crate::api::server::WalletServer;
use crate::api::types::ErrorResponse;

/// Reject requests over the server-wide quota with 429.
pub async fn enforce_rate_limit(
    State(state): State<Arc<WalletServer>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.rate_limiter.allow() {
        tracing::warn!("Rate limit exceeded for {}", request.uri().path());
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Too many requests".to_string(),
                code: "RATE_LIMITED".to_string(),
            }),
        )
            .into_response();
    }
    next.run(request).await
}
