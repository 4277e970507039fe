use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::approvals::{Approval, ApprovalStatus};
use crate::core::domain::{Address, Unit, Wei};
use crate::core::errors::WalletError;
use crate::core::ledger::TransferRecord;

/// Register a wallet address with the ledger
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegisterWalletRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub address: String,
    /// Balance in native units, exact decimal
    pub balance_native: String,
    /// Balance in wei, as a decimal string
    pub balance_wei: String,
}

impl WalletResponse {
    pub fn new(address: String, balance: Wei) -> Self {
        Self {
            address,
            balance_native: balance.to_native_string(),
            balance_wei: balance.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrepareTransferRequest {
    pub recipient: String,
    /// Positive decimal in `unit`
    #[serde(alias = "amount")]
    pub amount_input: String,
    #[serde(default = "default_unit")]
    pub unit: Unit,
}

fn default_unit() -> Unit {
    Unit::Native
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrepareTransferResponse {
    pub approval_id: String,
    /// Exact text to sign with `personal_sign`
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: i64,
    pub recipient: String,
    pub amount_wei: String,
    pub amount_native: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_fiat: Option<String>,
    /// Fiat per native unit used for the conversion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiat_rate: Option<String>,
}

impl PrepareTransferResponse {
    pub fn from_approval(approval: &Approval, now: DateTime<Utc>) -> Self {
        let fiat_rate = match approval.amount() {
            crate::core::domain::TransferAmount::Fiat { quote, .. } => Some(quote.rate.to_string()),
            crate::core::domain::TransferAmount::Native { .. } => None,
        };
        Self {
            approval_id: approval.id().to_string(),
            message: approval.message().to_string(),
            issued_at: approval.issued_at(),
            expires_at: approval.expires_at(),
            expires_in_secs: approval.seconds_remaining(now),
            recipient: approval.recipient().to_string(),
            amount_wei: approval.amount().wei().to_string(),
            amount_native: approval.amount().native_string(),
            amount_fiat: approval.amount().fiat_string(),
            fiat_rate,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExecuteTransferRequest {
    pub approval_id: String,
    /// 0x-prefixed 65-byte `r ‖ s ‖ v` signature
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub approval_id: String,
    pub status: ApprovalStatus,
    pub sender: String,
    pub recipient: String,
    pub amount_wei: String,
    pub amount_native: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_fiat: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub sender_balance_native: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApprovalIdRequest {
    pub approval_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalStatusResponse {
    pub approval_id: String,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: i64,
}

impl ApprovalStatusResponse {
    pub fn from_approval(approval: &Approval, now: DateTime<Utc>) -> Self {
        let expires_in_secs = if approval.status() == ApprovalStatus::Pending {
            approval.seconds_remaining(now)
        } else {
            0
        };
        Self {
            approval_id: approval.id().to_string(),
            status: approval.status(),
            expires_at: approval.expires_at(),
            expires_in_secs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub amount_native: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_fiat: Option<String>,
    pub approval_id: String,
}

impl From<&TransferRecord> for HistoryItem {
    fn from(record: &TransferRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            sender: record.sender.to_string(),
            recipient: record.recipient.to_string(),
            amount_native: record.amount_native(),
            amount_fiat: record.amount_fiat(),
            approval_id: record.approval_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// HTTP status for each error kind.
pub fn status_for(err: &WalletError) -> StatusCode {
    match err {
        WalletError::InvalidMnemonic(_)
        | WalletError::InvalidDerivationIndex(_)
        | WalletError::InvalidKey(_)
        | WalletError::InvalidAmount(_)
        | WalletError::InvalidRecipient(_)
        | WalletError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
        WalletError::RateUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        WalletError::ApprovalNotFound(_) => StatusCode::NOT_FOUND,
        WalletError::ApprovalExpired(_) => StatusCode::GONE,
        WalletError::ApprovalAlreadyConsumed(_) | WalletError::PriceMoved(_) => StatusCode::CONFLICT,
        WalletError::SignatureMismatch(_) => StatusCode::FORBIDDEN,
        WalletError::InsufficientBalance(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WalletError::ConfigError(_) | WalletError::StorageError(_) | WalletError::InternalError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// 404 for a caller the ledger has never seen.
pub fn wallet_not_found(address: &Address) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Wallet {} is not registered", address),
            code: "WALLET_NOT_FOUND".to_string(),
        }),
    )
}

pub fn api_error(err: WalletError) -> ApiError {
    let status = status_for(&err);
    let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Internal failure: {}", err);
        "Internal server error".to_string()
    } else {
        err.to_string()
    };
    (status, Json(ErrorResponse { error, code: err.code().to_string() }))
}
