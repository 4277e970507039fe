//! BIP44 derivation paths
//!
//! Path format: m/44'/coin_type'/account'/change/address_index
//!
//! Wallets in this crate always use the Ethereum coin type (60) on the
//! external chain: `m/44'/60'/0'/0/{index}`.

use std::fmt;

use crate::core::errors::WalletError;

const HARDENED: u32 = 0x8000_0000;

/// Ethereum coin type (SLIP-44)
pub const ETHEREUM_COIN_TYPE: u32 = 60;

/// Highest accepted address index. Larger values would collide with the
/// hardened range of the last, non-hardened path component.
pub const MAX_DERIVATION_INDEX: u32 = HARDENED - 1;

/// BIP44 derivation path structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bip44Path {
    /// Cryptocurrency type (60=ETH)
    pub coin_type: u32,
    /// Account index
    pub account: u32,
    /// External/internal chain (0=external, 1=internal change)
    pub change: u32,
    /// Address index within the chain
    pub address_index: u32,
}

impl Bip44Path {
    /// Create default Ethereum path: m/44'/60'/0'/0/0
    pub fn ethereum_default() -> Self {
        Self::ethereum(0)
    }

    /// Ethereum external-chain path at `address_index`
    pub fn ethereum(address_index: u32) -> Self {
        Self {
            coin_type: ETHEREUM_COIN_TYPE,
            account: 0,
            change: 0,
            address_index,
        }
    }

    /// Generate complete derivation path indices
    pub fn to_derivation_path(&self) -> [u32; 5] {
        [
            HARDENED | 44,             // purpose (hardened)
            HARDENED | self.coin_type, // coin_type' (hardened)
            HARDENED | self.account,   // account' (hardened)
            self.change,               // change (non-hardened)
            self.address_index,        // address_index (non-hardened)
        ]
    }
}

impl fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/{}/{}",
            self.coin_type, self.account, self.change, self.address_index
        )
    }
}

/// Validate a caller-supplied address index against `max`.
///
/// Accepts a signed value so that negative input from outer layers is
/// reported as `InvalidDerivationIndex` rather than wrapping.
pub fn check_index(index: i64, max: u32) -> Result<u32, WalletError> {
    if index < 0 {
        return Err(WalletError::InvalidDerivationIndex(format!(
            "index {} is negative",
            index
        )));
    }
    let max = max.min(MAX_DERIVATION_INDEX);
    if index > i64::from(max) {
        return Err(WalletError::InvalidDerivationIndex(format!(
            "index {} exceeds maximum {}",
            index, max
        )));
    }
    Ok(index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bip44_path() {
        let path = Bip44Path::ethereum_default();
        let indices = path.to_derivation_path();

        assert_eq!(indices.len(), 5);
        assert_eq!(indices[0], 0x8000002C); // 44'
        assert_eq!(indices[1], 0x8000003C); // 60'
        assert_eq!(indices[2], 0x80000000); // 0'
        assert_eq!(indices[3], 0); // 0
        assert_eq!(indices[4], 0); // 0
    }

    #[test]
    fn test_path_display() {
        assert_eq!(Bip44Path::ethereum_default().to_string(), "m/44'/60'/0'/0/0");
        assert_eq!(Bip44Path::ethereum(7).to_string(), "m/44'/60'/0'/0/7");
    }

    #[test]
    fn test_check_index_bounds() {
        assert_eq!(check_index(0, MAX_DERIVATION_INDEX).unwrap(), 0);
        assert_eq!(check_index(i64::from(MAX_DERIVATION_INDEX), MAX_DERIVATION_INDEX).unwrap(), MAX_DERIVATION_INDEX);
        assert!(matches!(check_index(-1, MAX_DERIVATION_INDEX), Err(WalletError::InvalidDerivationIndex(_))));
        assert!(matches!(
            check_index(i64::from(MAX_DERIVATION_INDEX) + 1, MAX_DERIVATION_INDEX),
            Err(WalletError::InvalidDerivationIndex(_))
        ));
        assert!(matches!(check_index(11, 10), Err(WalletError::InvalidDerivationIndex(_))));
    }
}
