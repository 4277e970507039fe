//! Signed, single-use transfer approvals.
//!
//! `prepare` issues an approval carrying a canonical message; the sender
//! signs that message off-line and presents the signature to `execute`. An
//! approval leaves `Pending` at most once: to `Executed`, `Expired` or
//! `Canceled`.
//!
//! The approvals lock is held across the final status check, the ledger
//! transfer and the `Executed` transition, so concurrent executions of the
//! same approval settle exactly once. Fiat approvals are re-quoted before
//! that step and refused if the rate drifted past the configured tolerance.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::ApprovalConfig;
use crate::core::domain::{
    fiat_to_wei, parse_fiat_cents, parse_native_amount, Address, FiatQuote, TransferAmount, Unit, Wei,
};
use crate::core::errors::WalletError;
use crate::core::ledger::{Ledger, TransferRecord};
use crate::core::notify::{LogNotifier, TransferNotifier};
use crate::core::rates::RateOracle;
use crate::crypto::signing::{EthereumMessageVerifier, RecoverableSignature, SignatureVerifier};

/// Ten years; larger configured durations are clamped to this.
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Executed,
    Expired,
    Canceled,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Canonical text the sender signs.
pub fn canonical_message(
    id: Uuid,
    sender: &Address,
    recipient: &Address,
    amount: &TransferAmount,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> String {
    format!(
        "APPROVAL_ID:{}|SENDER:{}|RECIPIENT:{}|AMOUNT_WEI:{}|ISSUED_MS:{}|EXP_MS:{}",
        id,
        sender,
        recipient,
        amount.wei(),
        issued_at.timestamp_millis(),
        expires_at.timestamp_millis()
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    id: Uuid,
    sender: Address,
    recipient: Address,
    amount: TransferAmount,
    message: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    status: ApprovalStatus,
    /// When the approval left `Pending`
    settled_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn amount(&self) -> &TransferAmount {
        &self.amount
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    /// Whole seconds left before expiry, for countdown display.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    fn settle(&mut self, status: ApprovalStatus, at: DateTime<Utc>) {
        self.status = status;
        self.settled_at = Some(at);
    }
}

/// Outcome of one [`ApprovalManager::sweep_expired`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending approvals that passed their expiry
    pub expired: usize,
    /// Terminal approvals removed after the retention window
    pub collected: usize,
}

pub struct ApprovalManager {
    approvals: Mutex<HashMap<Uuid, Approval>>,
    ledger: Arc<Ledger>,
    oracle: Arc<dyn RateOracle>,
    verifier: Arc<dyn SignatureVerifier>,
    notifier: Arc<dyn TransferNotifier>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    skew_tolerance: Duration,
    retention: Duration,
    max_slippage_bps: u32,
}

impl ApprovalManager {
    pub fn new(config: &ApprovalConfig, ledger: Arc<Ledger>, oracle: Arc<dyn RateOracle>) -> Self {
        Self {
            approvals: Mutex::new(HashMap::new()),
            ledger,
            oracle,
            verifier: Arc::new(EthereumMessageVerifier),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
            ttl: seconds(config.ttl_secs),
            skew_tolerance: seconds(config.clock_skew_tolerance_secs),
            retention: seconds(config.retention_secs),
            max_slippage_bps: config.max_fiat_slippage_bps,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn TransferNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a pending approval for `sender` to pay `recipient`.
    ///
    /// # Arguments
    /// * `sender` - authenticated caller
    /// * `recipient` - 0x-prefixed address
    /// * `amount_input` - positive decimal in `unit`
    /// * `unit` - `Native`, or `Fiat` converted through the rate oracle
    pub async fn prepare(
        &self,
        sender: Address,
        recipient: &str,
        amount_input: &str,
        unit: Unit,
    ) -> Result<Approval, WalletError> {
        let recipient: Address = recipient.parse()?;
        let amount = match unit {
            Unit::Native => TransferAmount::Native { wei: parse_native_amount(amount_input)? },
            Unit::Fiat => {
                let cents = parse_fiat_cents(amount_input)?;
                let rate = self.oracle.fiat_per_native().await?;
                let wei = fiat_to_wei(cents, rate)?;
                TransferAmount::Fiat { wei, quote: FiatQuote { cents, rate } }
            }
        };

        let id = Uuid::new_v4();
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl;
        let approval = Approval {
            id,
            sender,
            recipient,
            message: canonical_message(id, &sender, &recipient, &amount, issued_at, expires_at),
            amount,
            issued_at,
            expires_at,
            status: ApprovalStatus::Pending,
            settled_at: None,
        };
        self.approvals.lock().insert(id, approval.clone());
        info!(
            "Prepared approval {}: {} -> {} ({} native), expires {}",
            id,
            sender,
            recipient,
            approval.amount.native_string(),
            expires_at
        );
        Ok(approval)
    }

    /// Settle an approval with the sender's signature over its message.
    pub async fn execute(&self, id: &str, signature: &str) -> Result<TransferRecord, WalletError> {
        self.settle(None, id, signature).await
    }

    /// Like [`execute`](Self::execute), but approvals owned by another
    /// sender are reported as not found.
    pub async fn execute_as(
        &self,
        caller: Address,
        id: &str,
        signature: &str,
    ) -> Result<TransferRecord, WalletError> {
        self.settle(Some(caller), id, signature).await
    }

    async fn settle(&self, caller: Option<Address>, id: &str, signature: &str) -> Result<TransferRecord, WalletError> {
        let id = parse_id(id)?;

        let (sender, message, amount) = {
            let mut approvals = self.approvals.lock();
            let approval = lookup(&mut approvals, id, caller)?;
            self.check_live(approval)?;
            (approval.sender, approval.message.clone(), approval.amount.clone())
        };

        let signer = signature
            .parse::<RecoverableSignature>()
            .and_then(|sig| self.verifier.recover(message.as_bytes(), &sig))
            .map_err(|e| {
                warn!("Approval {} rejected: unusable signature ({})", id, e);
                WalletError::SignatureMismatch(format!("signature does not verify: {}", e))
            })?;
        if signer != sender {
            warn!("Approval {} rejected: signed by {}, expected {}", id, signer, sender);
            return Err(WalletError::SignatureMismatch(format!(
                "recovered {}, expected {}",
                signer, sender
            )));
        }

        if let TransferAmount::Fiat { wei, quote } = &amount {
            self.check_slippage(id, *wei, quote).await?;
        }

        let record = {
            let mut approvals = self.approvals.lock();
            let approval = lookup(&mut approvals, id, caller)?;
            self.check_live(approval)?;
            let now = self.clock.now();
            let record = self
                .ledger
                .apply_transfer(approval.sender, approval.recipient, &approval.amount, id, now)
                .map_err(|e| {
                    warn!("Approval {} not settled: {}", id, e);
                    e
                })?;
            approval.settle(ApprovalStatus::Executed, now);
            record
        };
        info!(
            "Executed approval {}: {} -> {} ({} native)",
            id,
            record.sender,
            record.recipient,
            record.amount_native()
        );

        if let Err(e) = self.notifier.transfer_settled(&record).await {
            warn!("Notification for approval {} failed: {}", id, e);
        }
        Ok(record)
    }

    /// Re-quote a fiat amount and refuse it if the converted value moved by
    /// more than `max_slippage_bps` of the quoted wei.
    async fn check_slippage(&self, id: Uuid, quoted: Wei, quote: &FiatQuote) -> Result<(), WalletError> {
        let rate = self.oracle.fiat_per_native().await?;
        let current = fiat_to_wei(quote.cents, rate)?;
        let drift = quoted.0.abs_diff(current.0);
        let allowed = quoted.0 / 10_000 * u128::from(self.max_slippage_bps)
            + quoted.0 % 10_000 * u128::from(self.max_slippage_bps) / 10_000;
        if drift > allowed {
            warn!(
                "Approval {} refused: rate moved from {} to {} (limit {} bps)",
                id, quote.rate, rate, self.max_slippage_bps
            );
            return Err(WalletError::PriceMoved(format!(
                "quoted at {} per native unit, now {}; prepare a new transfer or retry",
                quote.rate, rate
            )));
        }
        debug!("Approval {} re-quoted at {} (quoted {})", id, rate, quote.rate);
        Ok(())
    }

    /// Expiry first, then single use.
    fn check_live(&self, approval: &mut Approval) -> Result<(), WalletError> {
        let now = self.clock.now();
        if now > approval.expires_at + self.skew_tolerance {
            if approval.status == ApprovalStatus::Pending {
                approval.settle(ApprovalStatus::Expired, now);
            }
            return Err(WalletError::ApprovalExpired(format!(
                "{} expired at {}",
                approval.id, approval.expires_at
            )));
        }
        if approval.status != ApprovalStatus::Pending {
            return Err(WalletError::ApprovalAlreadyConsumed(format!(
                "{} is {:?}",
                approval.id, approval.status
            )));
        }
        Ok(())
    }

    /// Abandon a pending approval. Local to this process.
    pub fn cancel(&self, id: &str) -> Result<Approval, WalletError> {
        self.cancel_inner(None, id)
    }

    /// Cancel on behalf of `caller`; foreign approvals are not found.
    pub fn cancel_as(&self, caller: Address, id: &str) -> Result<Approval, WalletError> {
        self.cancel_inner(Some(caller), id)
    }

    fn cancel_inner(&self, caller: Option<Address>, id: &str) -> Result<Approval, WalletError> {
        let id = parse_id(id)?;
        let mut approvals = self.approvals.lock();
        let approval = lookup(&mut approvals, id, caller)?;
        self.check_live(approval)?;
        approval.settle(ApprovalStatus::Canceled, self.clock.now());
        info!("Canceled approval {}", id);
        Ok(approval.clone())
    }

    /// Snapshot of an approval.
    pub fn get(&self, id: &str) -> Result<Approval, WalletError> {
        let id = parse_id(id)?;
        self.approvals
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| WalletError::ApprovalNotFound(id.to_string()))
    }

    pub fn pending_count(&self) -> usize {
        self.approvals
            .lock()
            .values()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .count()
    }

    /// Expire overdue approvals and drop terminal ones past retention.
    pub fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let mut approvals = self.approvals.lock();
        for approval in approvals.values_mut() {
            if approval.status == ApprovalStatus::Pending && now > approval.expires_at + self.skew_tolerance {
                approval.settle(ApprovalStatus::Expired, now);
                report.expired += 1;
            }
        }
        let before = approvals.len();
        let retention = self.retention;
        approvals.retain(|_, a| match a.settled_at {
            Some(at) if a.status.is_terminal() => now - at <= retention,
            _ => true,
        });
        report.collected = before - approvals.len();
        if report.expired > 0 || report.collected > 0 {
            debug!("Sweep: {} expired, {} collected", report.expired, report.collected);
        }
        report
    }
}

fn parse_id(id: &str) -> Result<Uuid, WalletError> {
    Uuid::parse_str(id.trim()).map_err(|_| WalletError::ApprovalNotFound(id.to_string()))
}

fn lookup(
    approvals: &mut HashMap<Uuid, Approval>,
    id: Uuid,
    caller: Option<Address>,
) -> Result<&mut Approval, WalletError> {
    match approvals.get_mut(&id) {
        Some(approval) if caller.map_or(true, |c| c == approval.sender) => Ok(approval),
        _ => Err(WalletError::ApprovalNotFound(id.to_string())),
    }
}
