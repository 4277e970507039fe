pub mod approvals;
pub mod bip44;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod notify;
pub mod rates;
pub mod validation;
pub mod wallet;

pub use approvals::{Approval, ApprovalManager, ApprovalStatus};
pub use domain::{Address, TransferAmount, Unit, Wei};
pub use ledger::{Ledger, TransferRecord};
pub use notify::{LogNotifier, TransferNotifier};
pub use wallet::HdWallet;
