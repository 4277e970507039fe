//! Ethereum `personal_sign` message signing and recovery.
//!
//! Messages are hashed as
//! `keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)` and signed
//! with a deterministic (RFC 6979) nonce. Signatures are the 65-byte
//! `r ‖ s ‖ v` encoding with `v ∈ {27, 28}` and low `s`.

use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::core::domain::Address;
use crate::core::errors::WalletError;
use crate::crypto::signature_utils::{ensure_low_s, recovery_id_from_v, v_from_recovery_id};

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length of an `r ‖ s ‖ v` signature in bytes
pub const SIGNATURE_LEN: usize = 65;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Prefixed digest that `personal_sign` signs over.
pub fn hash_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// 65-byte recoverable signature, `r ‖ s ‖ v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Wrap raw bytes. The `v` byte must be 0, 1, 27 or 28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let raw: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            WalletError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            ))
        })?;
        recovery_id_from_v(raw[64])?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl FromStr for RecoverableSignature {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body)
            .map_err(|e| WalletError::InvalidSignature(format!("not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn signing_key(private_key: &[u8]) -> Result<SigningKey, WalletError> {
    SigningKey::from_slice(private_key)
        .map_err(|_| WalletError::InvalidKey("not a valid secp256k1 scalar".into()))
}

/// Address of an uncompressed public key: last 20 bytes of its keccak hash.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address::from_bytes(out)
}

pub fn address_from_private_key(private_key: &[u8]) -> Result<Address, WalletError> {
    Ok(address_from_verifying_key(signing_key(private_key)?.verifying_key()))
}

/// Sign `message` the way `personal_sign` does.
///
/// # Arguments
/// * `private_key` - 32-byte secp256k1 scalar
/// * `message` - raw message bytes, prefixed and hashed internally
pub fn sign_message(private_key: &[u8], message: &[u8]) -> Result<RecoverableSignature, WalletError> {
    let key = signing_key(private_key)?;
    let digest = hash_message(message);
    let (sig, recid) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| WalletError::InternalError(format!("signing failed: {}", e)))?;
    let (sig, recid) = ensure_low_s(sig, recid);

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = v_from_recovery_id(recid);
    Ok(RecoverableSignature(out))
}

/// Recover the signer address of a `personal_sign` signature.
///
/// High-S signatures are accepted and normalized before recovery.
pub fn recover_address(message: &[u8], signature: &RecoverableSignature) -> Result<Address, WalletError> {
    let recid = recovery_id_from_v(signature.v())?;
    let sig = Signature::from_slice(&signature.0[..64])
        .map_err(|_| WalletError::InvalidSignature("r or s out of range".into()))?;
    let (sig, recid) = ensure_low_s(sig, recid);
    let digest = hash_message(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recid)
        .map_err(|_| WalletError::InvalidSignature("public key recovery failed".into()))?;
    let address = address_from_verifying_key(&key);
    debug!("Recovered signer {}", address);
    Ok(address)
}

/// Seam between the approval protocol and the signature scheme.
pub trait SignatureVerifier: Send + Sync {
    fn recover(&self, message: &[u8], signature: &RecoverableSignature) -> Result<Address, WalletError>;
}

/// `personal_sign` verifier over secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumMessageVerifier;

impl SignatureVerifier for EthereumMessageVerifier {
    fn recover(&self, message: &[u8], signature: &RecoverableSignature) -> Result<Address, WalletError> {
        recover_address(message, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn key() -> Vec<u8> {
        hex::decode(HARDHAT_KEY).unwrap()
    }

    #[test]
    fn test_address_from_private_key() {
        let addr = address_from_private_key(&key()).unwrap();
        assert_eq!(addr.to_string(), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }

    #[test]
    fn test_hash_message_prefix() {
        let mut expected = b"\x19Ethereum Signed Message:\n5".to_vec();
        expected.extend_from_slice(b"hello");
        assert_eq!(hash_message(b"hello"), keccak256(&expected));
    }

    #[test]
    fn test_sign_is_deterministic_and_low_s() {
        let a = sign_message(&key(), b"approve").unwrap();
        let b = sign_message(&key(), b"approve").unwrap();
        assert_eq!(a, b);
        assert!(a.v() == 27 || a.v() == 28);
        let sig = Signature::from_slice(&a.as_bytes()[..64]).unwrap();
        assert!(sig.normalize_s().is_none());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(sign_message(&[0u8; 32], b"x"), Err(WalletError::InvalidKey(_))));
        assert!(matches!(sign_message(&[1u8; 31], b"x"), Err(WalletError::InvalidKey(_))));
    }

    #[test]
    fn test_signature_hex_parsing() {
        let sig = sign_message(&key(), b"hello").unwrap();
        let text = sig.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 130);
        let parsed: RecoverableSignature = text.parse().unwrap();
        assert_eq!(parsed, sig);
        assert!(matches!("0x1234".parse::<RecoverableSignature>(), Err(WalletError::InvalidSignature(_))));
        assert!(matches!("zz".parse::<RecoverableSignature>(), Err(WalletError::InvalidSignature(_))));
    }
}
