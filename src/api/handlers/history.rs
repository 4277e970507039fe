use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::api::middleware::CallerAddress;
use crate::api::server::WalletServer;
use crate::api::types::*;

/// Transfers involving the caller, newest first.
pub async fn get_history(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
) -> ApiResult<HistoryResponse> {
    let items = state.ledger.history(&caller).iter().map(HistoryItem::from).collect();
    Ok(Json(HistoryResponse { items }))
}
