use bip39::{Language, Mnemonic};
use tracing::info;

use super::{derive_at, derive_many, HdWallet};
use crate::core::bip44::{check_index, MAX_DERIVATION_INDEX};
use crate::core::domain::Address;
use crate::core::errors::WalletError;

/// Words in an accepted phrase
pub const MNEMONIC_WORDS: usize = 12;

/// Lowercase the phrase and collapse runs of whitespace to single spaces.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse and checksum-validate a 12-word English phrase.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = normalize_phrase(phrase);
    let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if words != MNEMONIC_WORDS {
        return Err(WalletError::InvalidMnemonic(format!(
            "expected {} words, got {}",
            MNEMONIC_WORDS, words
        )));
    }
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Restore the wallet at `index` from an existing phrase.
///
/// # Arguments
/// * `phrase` - 12 English words; case and spacing are normalized
/// * `index` - address index on `m/44'/60'/0'/0`, between 0 and `MAX_DERIVATION_INDEX`
pub fn import_from_mnemonic(phrase: &str, index: i64) -> Result<HdWallet, WalletError> {
    import_with_limit(phrase, index, MAX_DERIVATION_INDEX)
}

/// Same as [`import_from_mnemonic`] with a tighter index ceiling.
pub fn import_with_limit(phrase: &str, index: i64, max_index: u32) -> Result<HdWallet, WalletError> {
    let mnemonic = parse_mnemonic(phrase)?;
    let index = check_index(index, max_index)?;
    let wallet = derive_at(&mnemonic, index)?;
    info!("Imported wallet {} at index {}", wallet.address(), index);
    Ok(wallet)
}

/// Most addresses one discovery call will derive.
pub const MAX_DERIVE_BATCH: u32 = 1000;

/// Addresses at `start..start + count`, for account discovery.
pub fn derive_addresses(phrase: &str, start: i64, count: u32) -> Result<Vec<(u32, Address)>, WalletError> {
    derive_addresses_with_limit(phrase, start, count, MAX_DERIVATION_INDEX)
}

/// Same as [`derive_addresses`] with a tighter index ceiling.
pub fn derive_addresses_with_limit(
    phrase: &str,
    start: i64,
    count: u32,
    max_index: u32,
) -> Result<Vec<(u32, Address)>, WalletError> {
    if count > MAX_DERIVE_BATCH {
        return Err(WalletError::InvalidDerivationIndex(format!(
            "count {} exceeds the batch limit of {}",
            count, MAX_DERIVE_BATCH
        )));
    }
    let mnemonic = parse_mnemonic(phrase)?;
    let first = check_index(start, max_index)?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let last = check_index(i64::from(first) + i64::from(count) - 1, max_index)?;
    derive_many(&mnemonic, first..=last)
}
