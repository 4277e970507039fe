//! Approval-based transfer handlers: prepare, execute, cancel, status

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

use crate::api::middleware::CallerAddress;
use crate::api::server::WalletServer;
use crate::api::types::*;
use crate::core::approvals::ApprovalStatus;

pub async fn prepare_transfer(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
    Json(payload): Json<PrepareTransferRequest>,
) -> ApiResult<PrepareTransferResponse> {
    if !state.ledger.is_registered(&caller) {
        return Err(wallet_not_found(&caller));
    }
    let approval = state
        .approvals
        .prepare(caller, &payload.recipient, &payload.amount_input, payload.unit)
        .await
        .map_err(api_error)?;
    Ok(Json(PrepareTransferResponse::from_approval(&approval, state.approvals.now())))
}

pub async fn execute_transfer(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
    Json(payload): Json<ExecuteTransferRequest>,
) -> ApiResult<TransferReceipt> {
    let record = state
        .approvals
        .execute_as(caller, &payload.approval_id, &payload.signature)
        .await
        .map_err(api_error)?;
    Ok(Json(TransferReceipt {
        approval_id: record.approval_id.to_string(),
        status: ApprovalStatus::Executed,
        sender: record.sender.to_string(),
        recipient: record.recipient.to_string(),
        amount_wei: record.amount_wei().to_string(),
        amount_native: record.amount_native(),
        amount_fiat: record.amount_fiat(),
        timestamp: record.timestamp,
        sender_balance_native: record.sender_balance_after.to_native_string(),
    }))
}

pub async fn cancel_transfer(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
    Json(payload): Json<ApprovalIdRequest>,
) -> ApiResult<ApprovalStatusResponse> {
    let approval = state.approvals.cancel_as(caller, &payload.approval_id).map_err(api_error)?;
    Ok(Json(ApprovalStatusResponse::from_approval(&approval, state.approvals.now())))
}

/// Status and remaining lifetime of one of the caller's approvals.
pub async fn transfer_status(
    State(state): State<Arc<WalletServer>>,
    CallerAddress(caller): CallerAddress,
    Path(approval_id): Path<String>,
) -> ApiResult<ApprovalStatusResponse> {
    let approval = state.approvals.get(&approval_id).map_err(api_error)?;
    if approval.sender() != caller {
        return Err(api_error(crate::core::errors::WalletError::ApprovalNotFound(approval_id)));
    }
    Ok(Json(ApprovalStatusResponse::from_approval(&approval, state.approvals.now())))
}
