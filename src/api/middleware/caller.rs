//! Caller identity extraction.
//!
//! The account system in front of this service authenticates the user and
//! forwards the wallet address in the `x-wallet-address` header.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::Json;

use crate::api::types::ErrorResponse;
use crate::core::domain::Address;

pub const CALLER_HEADER: &str = "x-wallet-address";

/// Authenticated caller's wallet address.
#[derive(Debug, Clone, Copy)]
pub struct CallerAddress(pub Address);

fn unauthorized(error: &str, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse { error: error.to_string(), code: code.to_string() }),
    )
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerAddress
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Unauthorized: caller address is required", "AUTH_REQUIRED"))?;
        let address = raw.parse::<Address>().map_err(|e| {
            tracing::warn!("Rejected caller header: {}", e);
            unauthorized("Unauthorized: caller address is malformed", "INVALID_CALLER")
        })?;
        Ok(CallerAddress(address))
    }
}
