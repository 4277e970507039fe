use bip39::{Language, Mnemonic};
use rand_core::{OsRng, RngCore};
use tracing::info;
use zeroize::Zeroizing;

use super::{derive_at, HdWallet};
use crate::core::errors::WalletError;

/// 128 bits of entropy -> 12 words
pub const ENTROPY_BYTES: usize = 16;

/// Create a fresh wallet at index 0 from OS entropy.
pub fn generate() -> Result<HdWallet, WalletError> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
    OsRng.fill_bytes(&mut entropy[..]);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..])
        .map_err(|e| WalletError::InternalError(format!("mnemonic generation failed: {}", e)))?;
    let wallet = derive_at(&mnemonic, 0)?;
    info!("Generated new wallet {}", wallet.address());
    Ok(wallet)
}
