//! Wallet registration and balance handlers

use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::CallerAddress;
use crate::api::server::WalletServer;
use crate::api::types::*;
use crate::core::domain::Address;

/// Register an address and assign its seed balance. Idempotent.
pub async fn register_wallet(
    State(state): State<Arc<WalletServer>>,
    Json(payload): Json<RegisterWalletRequest>,
) -> ApiResult<WalletResponse> {
    let address: Address = payload.address.parse().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: format!("{}", e), code: "INVALID_ADDRESS".to_string() }),
        )
    })?;
    let balance = state.ledger.seed_balance(address);
    info!("Wallet {} registered", address);
    Ok(Json(WalletResponse::new(address.to_string(), balance)))
}

/// Caller's address and balance.
pub async fn get_my_wallet(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
) -> ApiResult<WalletResponse> {
    if !state.ledger.is_registered(&caller) {
        return Err(wallet_not_found(&caller));
    }
    Ok(Json(WalletResponse::new(caller.to_string(), state.ledger.balance(&caller))))
}
