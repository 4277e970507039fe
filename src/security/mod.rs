// src/security/mod.rs
//! Secret handling for the wallet: zeroizing buffers and client-side
//! credential storage.

pub mod credentials;
pub mod secret;

pub use credentials::{
    persist_wallet, sign_with, CredentialProvider, FileKeyStore, MemoryKeyStore, MNEMONIC_SLOT,
    PRIVATE_KEY_SLOT,
};
pub use secret::SecretVec;
