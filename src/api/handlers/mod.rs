//! API handlers, split by resource

pub mod health;
pub mod history;
pub mod transfer;
pub mod wallet;

pub use health::health_check;
pub use history::get_history;
pub use transfer::{cancel_transfer, execute_transfer, prepare_transfer, transfer_status};
pub use wallet::{get_my_wallet, register_wallet};
