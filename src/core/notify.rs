//! Post-settlement notifications.

use async_trait::async_trait;
use tracing::info;

use crate::core::errors::WalletError;
use crate::core::ledger::TransferRecord;

/// Told about every executed transfer. Failures are logged by the caller
/// and never undo the transfer.
#[async_trait]
pub trait TransferNotifier: Send + Sync {
    async fn transfer_settled(&self, record: &TransferRecord) -> Result<(), WalletError>;
}

/// Writes the notification to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl TransferNotifier for LogNotifier {
    async fn transfer_settled(&self, record: &TransferRecord) -> Result<(), WalletError> {
        let fiat = record
            .amount_fiat()
            .map(|f| format!(" ({} fiat)", f))
            .unwrap_or_default();
        info!(
            "[notify] {}: sent {} native{} to {} at {}",
            record.sender,
            record.amount_native(),
            fiat,
            record.recipient,
            record.timestamp.to_rfc3339()
        );
        Ok(())
    }
}
