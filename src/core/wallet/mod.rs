//! Hierarchical deterministic wallets.
//!
//! A wallet is a pure function of (mnemonic, index): the BIP-39 seed (empty
//! passphrase) is walked down `m/44'/60'/0'/0/{index}` with BIP-32 and the
//! resulting secp256k1 key yields the address.

pub mod create;
pub mod recover;

use bip39::Mnemonic;
use coins_bip32::xkeys::{Parent, XPriv};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::bip44::Bip44Path;
use crate::core::domain::Address;
use crate::core::errors::WalletError;
use crate::crypto::signing::address_from_verifying_key;
use crate::security::secret::{redacted, vec_to_secret, SecretString, SecretVec};

pub use create::generate;
pub use recover::{
    derive_addresses, derive_addresses_with_limit, import_from_mnemonic, import_with_limit, MAX_DERIVE_BATCH,
};

/// Derived wallet: address plus the secrets it came from.
///
/// Key material is zeroized when the wallet is dropped.
pub struct HdWallet {
    address: Address,
    private_key: SecretVec,
    mnemonic: SecretString,
    index: u32,
}

impl HdWallet {
    pub fn address(&self) -> Address {
        self.address
    }

    /// 32-byte secp256k1 private key
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Canonical phrase: lowercase words separated by single spaces
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn path(&self) -> Bip44Path {
        Bip44Path::ethereum(self.index)
    }
}

impl fmt::Debug for HdWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdWallet")
            .field("address", &self.address)
            .field("index", &self.index)
            .field("private_key", &redacted(self.private_key.len()))
            .field("mnemonic", &redacted(self.mnemonic.len()))
            .finish()
    }
}

/// External-chain node `m/44'/60'/0'/0` for `mnemonic`.
fn external_chain(mnemonic: &Mnemonic) -> Result<XPriv, WalletError> {
    let seed = Zeroizing::new(mnemonic.to_seed(""));
    let mut xprv = XPriv::root_from_seed(&seed[..], None)
        .map_err(|e| WalletError::InternalError(format!("root key derivation failed: {}", e)))?;
    let path = Bip44Path::ethereum_default().to_derivation_path();
    for p in &path[..4] {
        xprv = xprv
            .derive_child(*p)
            .map_err(|e| WalletError::InternalError(format!("child derivation failed: {}", e)))?;
    }
    Ok(xprv)
}

fn child_key(chain: &XPriv, index: u32) -> Result<(Address, SecretVec), WalletError> {
    let child = chain
        .derive_child(index)
        .map_err(|e| WalletError::InternalError(format!("child derivation failed: {}", e)))?;
    let sk: &k256::ecdsa::SigningKey = child.as_ref();
    let address = address_from_verifying_key(sk.verifying_key());
    Ok((address, vec_to_secret(sk.to_bytes().to_vec())))
}

/// Derive the wallet at `index`. The index must already be range-checked.
pub(crate) fn derive_at(mnemonic: &Mnemonic, index: u32) -> Result<HdWallet, WalletError> {
    let chain = external_chain(mnemonic)?;
    let (address, private_key) = child_key(&chain, index)?;
    debug!("Derived {} at {}", address, Bip44Path::ethereum(index));
    Ok(HdWallet {
        address,
        private_key,
        mnemonic: Zeroizing::new(mnemonic.to_string()),
        index,
    })
}

/// Addresses for `indices`, walking the external chain once.
pub(crate) fn derive_many(
    mnemonic: &Mnemonic,
    indices: impl IntoIterator<Item = u32>,
) -> Result<Vec<(u32, Address)>, WalletError> {
    let chain = external_chain(mnemonic)?;
    indices
        .into_iter()
        .map(|i| child_key(&chain, i).map(|(address, _)| (i, address)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bip39::Language;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derive_at_matches_direct_path_walk() {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, PHRASE).unwrap();
        let wallet = derive_at(&mnemonic, 3).unwrap();

        let seed = mnemonic.to_seed("");
        let mut xprv = XPriv::root_from_seed(&seed, None).expect("root");
        for p in Bip44Path::ethereum(3).to_derivation_path() {
            xprv = xprv.derive_child(p).expect("derive child");
        }
        let sk_ref: &k256::ecdsa::SigningKey = xprv.as_ref();
        assert_eq!(wallet.private_key(), sk_ref.to_bytes().as_slice());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, PHRASE).unwrap();
        let wallet = derive_at(&mnemonic, 0).unwrap();
        let shown = format!("{:?}", wallet);
        assert!(!shown.contains("abandon"));
        assert!(!shown.contains(&hex::encode(wallet.private_key())));
        assert!(shown.contains("redacted"));
    }
}
