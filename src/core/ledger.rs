//! In-process balance store and transfer history.
//!
//! Balances are only mutated through [`Ledger::apply_transfer`], which the
//! approval manager calls after a signature has been verified. The balance
//! check, both balance updates and the history append happen under a single
//! lock, so the total supply is invariant across transfers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::LedgerConfig;
use crate::core::domain::{parse_native_amount, Address, TransferAmount, Wei};
use crate::core::errors::WalletError;

/// Seed balances are drawn in steps of 10^-6 native units.
const SEED_STEP_WEI: u128 = 1_000_000_000_000;

/// A settled transfer. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub sender: Address,
    pub recipient: Address,
    pub amount: TransferAmount,
    pub timestamp: DateTime<Utc>,
    pub approval_id: Uuid,
    /// Sender's balance right after this transfer was applied
    #[serde(skip)]
    pub sender_balance_after: Wei,
}

impl TransferRecord {
    pub fn amount_wei(&self) -> Wei {
        self.amount.wei()
    }

    pub fn amount_native(&self) -> String {
        self.amount.native_string()
    }

    pub fn amount_fiat(&self) -> Option<String> {
        self.amount.fiat_string()
    }
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, Wei>,
    history: Vec<TransferRecord>,
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    seed_min_steps: u128,
    seed_max_steps: u128,
}

impl Ledger {
    pub fn new(config: &LedgerConfig) -> Result<Self, WalletError> {
        let min = parse_native_amount(&config.seed_min_native)
            .map_err(|e| WalletError::ConfigError(format!("ledger.seed_min_native: {}", e)))?;
        let max = parse_native_amount(&config.seed_max_native)
            .map_err(|e| WalletError::ConfigError(format!("ledger.seed_max_native: {}", e)))?;
        if min > max {
            return Err(WalletError::ConfigError(
                "ledger.seed_min_native must not exceed ledger.seed_max_native".into(),
            ));
        }
        Ok(Self::with_seed_range(min, max))
    }

    /// Ledger seeding new accounts uniformly in `[min, max]`.
    /// Bounds are rounded to the seed step; `min == max` gives a fixed seed.
    pub fn with_seed_range(min: Wei, max: Wei) -> Self {
        let seed_min_steps = min.0.div_ceil(SEED_STEP_WEI);
        let seed_max_steps = (max.0 / SEED_STEP_WEI).max(seed_min_steps);
        Self {
            state: Mutex::new(LedgerState::default()),
            seed_min_steps,
            seed_max_steps,
        }
    }

    /// Register `address` with a random starting balance.
    ///
    /// Idempotent: an already known address keeps its balance. Returns the
    /// current balance either way.
    pub fn seed_balance(&self, address: Address) -> Wei {
        let mut state = self.state.lock();
        if let Some(existing) = state.balances.get(&address) {
            debug!("Wallet {} already registered", address);
            return *existing;
        }
        let steps = rand::thread_rng().gen_range(self.seed_min_steps..=self.seed_max_steps);
        let seeded = Wei(steps * SEED_STEP_WEI);
        state.balances.insert(address, seeded);
        info!("Registered wallet {} with {} native", address, seeded.to_native_string());
        seeded
    }

    /// Balance of `address`; unknown addresses hold zero.
    pub fn balance(&self, address: &Address) -> Wei {
        self.state.lock().balances.get(address).copied().unwrap_or_default()
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.state.lock().balances.contains_key(address)
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Wei {
        Wei(self.state.lock().balances.values().map(|w| w.0).sum())
    }

    /// Move `amount` from `sender` to `recipient` and append the record.
    ///
    /// An unknown recipient is created with a zero balance. On
    /// `InsufficientBalance` nothing is changed.
    pub(crate) fn apply_transfer(
        &self,
        sender: Address,
        recipient: Address,
        amount: &TransferAmount,
        approval_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<TransferRecord, WalletError> {
        let value = amount.wei();
        let mut state = self.state.lock();

        let available = state.balances.get(&sender).copied().unwrap_or_default();
        let debited = available.checked_sub(value).ok_or_else(|| {
            WalletError::InsufficientBalance(format!(
                "{} holds {} native, needs {}",
                sender,
                available.to_native_string(),
                value.to_native_string()
            ))
        })?;

        let sender_balance_after = if sender != recipient {
            let credited = state
                .balances
                .get(&recipient)
                .copied()
                .unwrap_or_default()
                .checked_add(value)
                .ok_or_else(|| WalletError::InternalError("recipient balance overflow".into()))?;
            state.balances.insert(sender, debited);
            state.balances.insert(recipient, credited);
            debited
        } else {
            *state.balances.entry(recipient).or_insert(Wei::ZERO)
        };

        let record = TransferRecord {
            sender,
            recipient,
            amount: amount.clone(),
            timestamp,
            approval_id,
            sender_balance_after,
        };
        state.history.push(record.clone());
        Ok(record)
    }

    /// Transfers involving `address`, newest first.
    pub fn history(&self, address: &Address) -> Vec<TransferRecord> {
        let state = self.state.lock();
        let mut items: Vec<TransferRecord> = state
            .history
            .iter()
            .rev()
            .filter(|r| &r.sender == address || &r.recipient == address)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Ledger")
            .field("accounts", &state.balances.len())
            .field("transfers", &state.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn native(n: u128) -> Wei {
        Wei(n * crate::core::domain::WEI_PER_NATIVE)
    }

    #[test]
    fn test_seed_is_idempotent_and_in_range() {
        let ledger = Ledger::new(&LedgerConfig::default()).unwrap();
        let first = ledger.seed_balance(addr(1));
        assert!(first >= native(1) && first <= native(10));
        assert_eq!(first.0 % SEED_STEP_WEI, 0);
        assert_eq!(ledger.seed_balance(addr(1)), first);
        assert_eq!(ledger.balance(&addr(1)), first);
    }

    #[test]
    fn test_transfer_moves_value_and_creates_recipient() {
        let ledger = Ledger::with_seed_range(native(5), native(5));
        ledger.seed_balance(addr(1));
        let amount = TransferAmount::Native { wei: native(2) };
        let record = ledger.apply_transfer(addr(1), addr(2), &amount, Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(record.sender_balance_after, native(3));
        assert_eq!(ledger.balance(&addr(1)), native(3));
        assert_eq!(ledger.balance(&addr(2)), native(2));
        assert!(ledger.is_registered(&addr(2)));
        assert_eq!(ledger.total_supply(), native(5));
    }

    #[test]
    fn test_insufficient_balance_changes_nothing() {
        let ledger = Ledger::with_seed_range(native(1), native(1));
        ledger.seed_balance(addr(1));
        let amount = TransferAmount::Native { wei: native(2) };
        let err = ledger
            .apply_transfer(addr(1), addr(2), &amount, Uuid::new_v4(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance(_)));
        assert_eq!(ledger.balance(&addr(1)), native(1));
        assert!(!ledger.is_registered(&addr(2)));
        assert!(ledger.history(&addr(1)).is_empty());
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let ledger = Ledger::with_seed_range(native(3), native(3));
        ledger.seed_balance(addr(1));
        let amount = TransferAmount::Native { wei: native(1) };
        let record = ledger.apply_transfer(addr(1), addr(1), &amount, Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(record.sender_balance_after, native(3));
        assert_eq!(ledger.balance(&addr(1)), native(3));
        assert_eq!(ledger.history(&addr(1)).len(), 1);
    }

    #[test]
    fn test_history_newest_first() {
        let ledger = Ledger::with_seed_range(native(5), native(5));
        ledger.seed_balance(addr(1));
        let amount = TransferAmount::Native { wei: native(1) };
        let t0 = Utc::now();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        ledger.apply_transfer(addr(1), addr(2), &amount, first, t0).unwrap();
        ledger
            .apply_transfer(addr(1), addr(3), &amount, second, t0 + chrono::Duration::seconds(1))
            .unwrap();
        let items = ledger.history(&addr(1));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].approval_id, second);
        assert_eq!(items[1].approval_id, first);
        assert_eq!(ledger.history(&addr(3)).len(), 1);
        assert!(ledger.history(&addr(9)).is_empty());
    }
}
