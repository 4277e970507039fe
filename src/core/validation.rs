use regex::Regex;
use sha3::{Digest, Keccak256};

use crate::core::errors::WalletError;

/// Validates an Ethereum address.
///
/// All-lowercase and all-uppercase bodies are accepted as-is; mixed case must
/// carry a valid EIP-55 checksum.
pub fn validate_ethereum_address(address: &str) -> Result<(), WalletError> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(WalletError::InvalidRecipient(format!(
            "'{}' is not a 0x-prefixed 20-byte address",
            address
        )));
    }
    let hex_regex = Regex::new(r"^0x[0-9a-fA-F]{40}$")
        .expect("Hardcoded regex should always compile");
    if !hex_regex.is_match(address) {
        return Err(WalletError::InvalidRecipient(format!(
            "'{}' contains non-hex characters",
            address
        )));
    }
    let body = &address[2..];
    let is_all_lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = body.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(());
    }
    if !is_eip55_checksum_valid(address) {
        return Err(WalletError::InvalidRecipient(format!(
            "'{}' has an invalid EIP-55 checksum",
            address
        )));
    }
    Ok(())
}

fn is_eip55_checksum_valid(addr: &str) -> bool {
    let body = &addr[2..];
    addr == to_checksum_address(&body.to_lowercase())
}

/// Render a 40-char lowercase hex body as an EIP-55 checksummed address.
pub fn to_checksum_address(lower_hex: &str) -> String {
    let hash = Keccak256::digest(lower_hex.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, ch) in lower_hex.chars().enumerate() {
        let nibble = (hash[i / 2] >> (4 * (1 - (i % 2)))) & 0x0f;
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Strict decimal validator for amounts to avoid float parsing where exactness matters.
/// Accepts patterns like 123, 0.1, 1.234567 up to `max_decimals`. No sign, no exponent.
pub fn validate_amount_strict(amount: &str, max_decimals: usize) -> Result<(), WalletError> {
    if amount.is_empty() {
        return Err(WalletError::InvalidAmount("amount cannot be empty".into()));
    }
    let re = Regex::new(&format!(r"^(?:0|[1-9]\d*)(?:\.(\d{{1,{}}}))?$", max_decimals))
        .expect("Decimal regex pattern should always be valid");
    if !re.is_match(amount) {
        return Err(WalletError::InvalidAmount(format!(
            "'{}' is not a decimal with at most {} fractional digits",
            amount, max_decimals
        )));
    }
    // disallow 0 or 0.0... values
    if amount.trim_matches('0').trim_matches('.').is_empty() {
        return Err(WalletError::InvalidAmount("amount must be positive".into()));
    }
    Ok(())
}
