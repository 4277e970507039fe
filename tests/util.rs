// tests/util.rs
// Shared test helpers for integration tests

use std::sync::Arc;

use approval_wallet::core::approvals::ApprovalManager;
use approval_wallet::core::clock::ManualClock;
use approval_wallet::core::config::ApprovalConfig;
use approval_wallet::core::domain::{parse_native_amount, Wei};
use approval_wallet::core::ledger::Ledger;
use approval_wallet::core::rates::{FixedRateOracle, RateOracle};
use approval_wallet::core::wallet::{import_from_mnemonic, HdWallet};
use rust_decimal::Decimal;

/// Well-known development phrase; index 0 is 0xf39F...2266.
pub const DEV_PHRASE: &str = "test test test test test test test test test test test junk";

/// BIP-39 reference phrase; index 0 is 0x9858...Da94.
#[allow(dead_code)]
pub const ABANDON_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[allow(dead_code)]
pub const RECIPIENT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

pub fn native(amount: &str) -> Wei {
    parse_native_amount(amount).expect("valid native amount")
}

pub fn dev_wallet(index: i64) -> HdWallet {
    import_from_mnemonic(DEV_PHRASE, index).expect("dev wallet")
}

/// Approval manager over a ledger that seeds every account with `seed`,
/// driven by a manual clock and a 3000 fiat/native rate.
pub struct Harness {
    pub ledger: Arc<Ledger>,
    pub manager: Arc<ApprovalManager>,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
pub fn harness(seed: &str) -> Harness {
    harness_with(seed, ApprovalConfig::default())
}

#[allow(dead_code)]
pub fn harness_with(seed: &str, config: ApprovalConfig) -> Harness {
    harness_with_oracle(seed, config, Arc::new(FixedRateOracle::new("USD", Decimal::from(3000))))
}

pub fn harness_with_oracle(seed: &str, config: ApprovalConfig, oracle: Arc<dyn RateOracle>) -> Harness {
    let seed = native(seed);
    let ledger = Arc::new(Ledger::with_seed_range(seed, seed));
    let clock = Arc::new(ManualClock::default());
    let manager = Arc::new(
        ApprovalManager::new(&config, ledger.clone(), oracle).with_clock(clock.clone()),
    );
    Harness { ledger, manager, clock }
}
