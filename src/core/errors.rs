use thiserror::Error;

/// Errors surfaced by key derivation, signing and the approval lifecycle.
///
/// Every variant is a terminal, caller-visible outcome; nothing in this crate
/// retries internally. `InsufficientBalance` and `PriceMoved` are the only
/// failures that leave an approval usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Mnemonic is malformed or its checksum does not match.
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    /// Derivation index is negative or above the supported maximum.
    #[error("Invalid derivation index: {0}")]
    InvalidDerivationIndex(String),
    /// Private key is not a valid secp256k1 scalar.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    /// Amount input is not a positive decimal in range.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// Recipient is not a well-formed address.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    /// No usable fiat rate could be obtained.
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),
    /// Unknown, collected, or foreign approval id.
    #[error("Approval not found: {0}")]
    ApprovalNotFound(String),
    /// Approval was presented after its expiry.
    #[error("Approval expired: {0}")]
    ApprovalExpired(String),
    /// Approval has already been executed or canceled.
    #[error("Approval already consumed: {0}")]
    ApprovalAlreadyConsumed(String),
    /// Signature does not recover to the approval's sender.
    #[error("Signature does not match sender: {0}")]
    SignatureMismatch(String),
    /// Sender cannot cover the transfer amount.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    /// Fiat rate drifted past the slippage tolerance since `prepare`.
    #[error("Price moved: {0}")]
    PriceMoved(String),
    /// Signature bytes are malformed and cannot be recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// Configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Key store / file errors.
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Internal errors.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WalletError {
    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidMnemonic(_) => "INVALID_MNEMONIC",
            WalletError::InvalidDerivationIndex(_) => "INVALID_DERIVATION_INDEX",
            WalletError::InvalidKey(_) => "INVALID_KEY",
            WalletError::InvalidAmount(_) => "INVALID_AMOUNT",
            WalletError::InvalidRecipient(_) => "INVALID_RECIPIENT",
            WalletError::RateUnavailable(_) => "RATE_UNAVAILABLE",
            WalletError::ApprovalNotFound(_) => "APPROVAL_NOT_FOUND",
            WalletError::ApprovalExpired(_) => "APPROVAL_EXPIRED",
            WalletError::ApprovalAlreadyConsumed(_) => "APPROVAL_ALREADY_CONSUMED",
            WalletError::SignatureMismatch(_) => "SIGNATURE_MISMATCH",
            WalletError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            WalletError::PriceMoved(_) => "PRICE_MOVED",
            WalletError::InvalidSignature(_) => "INVALID_SIGNATURE",
            WalletError::ConfigError(_) => "CONFIG_ERROR",
            WalletError::StorageError(_) => "STORAGE_ERROR",
            WalletError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the same approval may still succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::InsufficientBalance(_) | WalletError::PriceMoved(_))
    }

    /// Whether the caller must call `prepare` again to make progress.
    pub fn requires_new_approval(&self) -> bool {
        matches!(
            self,
            WalletError::ApprovalNotFound(_)
                | WalletError::ApprovalExpired(_)
                | WalletError::ApprovalAlreadyConsumed(_)
        )
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(err: toml::de::Error) -> Self {
        WalletError::ConfigError(err.to_string())
    }
}
