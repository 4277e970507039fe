//! Client-side key storage.
//!
//! The private key and mnemonic live under fixed slot names in whatever
//! store the client provides. Signing goes through [`sign_with`], which
//! holds the key only for the duration of the call.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::errors::WalletError;
use crate::core::wallet::HdWallet;
use crate::crypto::signing::{sign_message, RecoverableSignature};
use crate::security::secret::{redacted, vec_to_secret, SecretString, SecretVec};

pub const PRIVATE_KEY_SLOT: &str = "private_key";
pub const MNEMONIC_SLOT: &str = "mnemonic";

/// Source of key material, acquired per use.
pub trait CredentialProvider: Send + Sync {
    fn load(&self, name: &str) -> Result<Option<SecretVec>, WalletError>;
    fn store(&self, name: &str, secret: &[u8]) -> Result<(), WalletError>;
    /// Remove every slot (logout).
    fn clear(&self) -> Result<(), WalletError>;
}

/// Write the wallet's private key and mnemonic to their slots.
pub fn persist_wallet(provider: &dyn CredentialProvider, wallet: &HdWallet) -> Result<(), WalletError> {
    provider.store(PRIVATE_KEY_SLOT, wallet.private_key())?;
    provider.store(MNEMONIC_SLOT, wallet.mnemonic().as_bytes())?;
    info!("Stored credentials for {}", wallet.address());
    Ok(())
}

/// Sign `message` with the stored private key. The key is dropped, and
/// zeroized, before this returns.
pub fn sign_with(provider: &dyn CredentialProvider, message: &[u8]) -> Result<RecoverableSignature, WalletError> {
    let key = provider
        .load(PRIVATE_KEY_SLOT)?
        .ok_or_else(|| WalletError::StorageError("no private key stored".into()))?;
    sign_message(&key, message)
}

/// In-memory store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryKeyStore {
    slots: RwLock<HashMap<String, SecretVec>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialProvider for MemoryKeyStore {
    fn load(&self, name: &str) -> Result<Option<SecretVec>, WalletError> {
        Ok(self.slots.read().get(name).map(|s| vec_to_secret(s.to_vec())))
    }

    fn store(&self, name: &str, secret: &[u8]) -> Result<(), WalletError> {
        self.slots.write().insert(name.to_string(), vec_to_secret(secret.to_vec()));
        Ok(())
    }

    fn clear(&self) -> Result<(), WalletError> {
        self.slots.write().clear();
        Ok(())
    }
}

const KDF_INFO: &[u8] = b"approval-wallet-keystore-v1";
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// On-disk layout. One salt per file, one nonce per sealed slot.
#[derive(Serialize, Deserialize)]
struct StoreFile {
    salt: String,
    slots: HashMap<String, SealedSlot>,
}

#[derive(Serialize, Deserialize)]
struct SealedSlot {
    nonce: String,
    ciphertext: String,
}

impl StoreFile {
    fn fresh() -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self { salt: hex::encode(salt), slots: HashMap::new() }
    }
}

/// JSON file of slots sealed with AES-256-GCM, written with owner-only
/// permissions. The cipher key comes from the passphrase through
/// HKDF-SHA256 with the file's salt; the slot name is bound as associated
/// data so sealed values cannot be moved between slots.
#[derive(Clone)]
pub struct FileKeyStore {
    path: PathBuf,
    passphrase: SecretString,
}

impl fmt::Debug for FileKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKeyStore")
            .field("path", &self.path)
            .field("passphrase", &redacted(self.passphrase.len()))
            .finish()
    }
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, WalletError> {
        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(WalletError::StorageError(format!(
                "passphrase must be at least {} characters",
                MIN_PASSPHRASE_LEN
            )));
        }
        Ok(Self { path: path.into(), passphrase: Zeroizing::new(passphrase.to_string()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the store at `path`. Works without the passphrase.
    pub fn wipe(path: &Path) -> Result<(), WalletError> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Cleared key store {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WalletError::StorageError(format!("{}: {}", path.display(), e))),
        }
    }

    fn cipher(&self, salt_hex: &str) -> Result<Aes256Gcm, WalletError> {
        let salt = decode_field(salt_hex, "salt")?;
        let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), self.passphrase.as_bytes());
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(KDF_INFO, &mut okm[..])
            .map_err(|e| WalletError::InternalError(format!("key derivation failed: {}", e)))?;
        Aes256Gcm::new_from_slice(&okm[..])
            .map_err(|e| WalletError::InternalError(format!("cipher setup failed: {}", e)))
    }

    fn read_file(&self) -> Result<Option<StoreFile>, WalletError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WalletError::StorageError(format!("{}: {}", self.path.display(), e))),
        }
    }

    fn write_file(&self, file: &StoreFile) -> Result<(), WalletError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, json.as_bytes())
            .map_err(|e| WalletError::StorageError(format!("{}: {}", self.path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)) {
                warn!("Failed to set 0o600 permissions on {}: {}", self.path.display(), e);
            }
        }
        Ok(())
    }
}

fn decode_field(value: &str, what: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|e| WalletError::StorageError(format!("{} is corrupt: {}", what, e)))
}

fn open_slot(cipher: &Aes256Gcm, name: &str, slot: &SealedSlot) -> Result<SecretVec, WalletError> {
    let nonce_bytes = decode_field(&slot.nonce, name)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(WalletError::StorageError(format!("slot '{}' has a malformed nonce", name)));
    }
    let ciphertext = decode_field(&slot.ciphertext, name)?;
    #[allow(deprecated)]
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .decrypt(nonce, Payload { msg: &ciphertext, aad: name.as_bytes() })
        .map(vec_to_secret)
        .map_err(|_| {
            WalletError::StorageError(format!(
                "cannot open slot '{}': wrong passphrase or corrupted data",
                name
            ))
        })
}

fn seal_slot(cipher: &Aes256Gcm, name: &str, secret: &[u8]) -> Result<SealedSlot, WalletError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    #[allow(deprecated)]
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: secret, aad: name.as_bytes() })
        .map_err(|e| WalletError::InternalError(format!("encryption failed: {}", e)))?;
    Ok(SealedSlot { nonce: hex::encode(nonce_bytes), ciphertext: hex::encode(ciphertext) })
}

impl CredentialProvider for FileKeyStore {
    fn load(&self, name: &str) -> Result<Option<SecretVec>, WalletError> {
        let Some(file) = self.read_file()? else {
            return Ok(None);
        };
        let Some(slot) = file.slots.get(name) else {
            return Ok(None);
        };
        let cipher = self.cipher(&file.salt)?;
        open_slot(&cipher, name, slot).map(Some)
    }

    fn store(&self, name: &str, secret: &[u8]) -> Result<(), WalletError> {
        let mut file = self.read_file()?.unwrap_or_else(StoreFile::fresh);
        let cipher = self.cipher(&file.salt)?;
        // every slot in a file shares one passphrase
        if let Some((existing, slot)) = file.slots.iter().next() {
            open_slot(&cipher, existing, slot)?;
        }
        file.slots.insert(name.to_string(), seal_slot(&cipher, name, secret)?);
        self.write_file(&file)?;
        debug!("Wrote slot '{}' to {}", name, self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), WalletError> {
        Self::wipe(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wallet::import_from_mnemonic;
    use crate::crypto::signing::recover_address;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_memory_store_roundtrip_and_clear() {
        let store = MemoryKeyStore::new();
        assert!(store.load(PRIVATE_KEY_SLOT).unwrap().is_none());
        store.store(PRIVATE_KEY_SLOT, &[7u8; 32]).unwrap();
        assert_eq!(store.load(PRIVATE_KEY_SLOT).unwrap().unwrap().as_slice(), &[7u8; 32]);
        store.clear().unwrap();
        assert!(store.load(PRIVATE_KEY_SLOT).unwrap().is_none());
    }

    #[test]
    fn test_sign_with_stored_key() {
        let wallet = import_from_mnemonic(PHRASE, 0).unwrap();
        let store = MemoryKeyStore::new();
        persist_wallet(&store, &wallet).unwrap();
        let sig = sign_with(&store, b"hello").unwrap();
        assert_eq!(recover_address(b"hello", &sig).unwrap(), wallet.address());
        assert_eq!(store.load(MNEMONIC_SLOT).unwrap().unwrap().as_slice(), PHRASE.as_bytes());
    }

    #[test]
    fn test_sign_with_empty_store() {
        let store = MemoryKeyStore::new();
        assert!(matches!(sign_with(&store, b"x"), Err(WalletError::StorageError(_))));
    }

    const PASSPHRASE: &str = "correct horse battery";

    #[test]
    fn test_file_store_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.json"), PASSPHRASE).unwrap();
        let wallet = import_from_mnemonic(PHRASE, 0).unwrap();
        persist_wallet(&store, &wallet).unwrap();

        let reopened = FileKeyStore::new(store.path(), PASSPHRASE).unwrap();
        let key = reopened.load(PRIVATE_KEY_SLOT).unwrap().unwrap();
        assert_eq!(key.as_slice(), wallet.private_key());
        assert_eq!(reopened.load(MNEMONIC_SLOT).unwrap().unwrap().as_slice(), PHRASE.as_bytes());

        reopened.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load(PRIVATE_KEY_SLOT).unwrap().is_none());
        reopened.clear().unwrap();
    }

    #[test]
    fn test_file_store_keeps_no_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.json"), PASSPHRASE).unwrap();
        let wallet = import_from_mnemonic(PHRASE, 0).unwrap();
        persist_wallet(&store, &wallet).unwrap();

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert!(!on_disk.contains(&hex::encode(wallet.private_key())));
        assert!(!on_disk.contains("junk"));
        assert!(!on_disk.contains(PASSPHRASE));
        assert!(on_disk.contains("ciphertext"));
    }

    #[test]
    fn test_file_store_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let store = FileKeyStore::new(&path, PASSPHRASE).unwrap();
        store.store(PRIVATE_KEY_SLOT, &[7u8; 32]).unwrap();

        let intruder = FileKeyStore::new(&path, "tr0ub4dor&3").unwrap();
        let err = intruder.load(PRIVATE_KEY_SLOT).unwrap_err();
        assert!(matches!(err, WalletError::StorageError(ref m) if m.contains("wrong passphrase")));
        // nor may it add slots under a different key
        assert!(intruder.store(MNEMONIC_SLOT, b"words").is_err());
        assert!(store.load(MNEMONIC_SLOT).unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_moved_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.json"), PASSPHRASE).unwrap();
        store.store(PRIVATE_KEY_SLOT, &[7u8; 32]).unwrap();

        let mut file: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let sealed = file["slots"][PRIVATE_KEY_SLOT].clone();
        file["slots"][MNEMONIC_SLOT] = sealed;
        std::fs::write(store.path(), file.to_string()).unwrap();

        assert!(matches!(store.load(MNEMONIC_SLOT), Err(WalletError::StorageError(_))));
    }

    #[test]
    fn test_short_passphrase_rejected() {
        assert!(matches!(FileKeyStore::new("keys.json", "short"), Err(WalletError::StorageError(_))));
    }

    #[test]
    fn test_debug_hides_passphrase() {
        let store = FileKeyStore::new("keys.json", PASSPHRASE).unwrap();
        assert!(!format!("{:?}", store).contains(PASSPHRASE));
    }
}
