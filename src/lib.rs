// src/lib.rs
//! HD wallet core with signed, single-use transfer approvals.
//!
//! - [`core::wallet`]: BIP-39 / BIP-44 key derivation
//! - [`crypto::signing`]: `personal_sign` signatures and signer recovery
//! - [`core::approvals`]: approval issue, verification and settlement
//! - [`core::ledger`]: balances and transfer history
//! - [`api`]: HTTP surface

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod network;
pub mod security;
