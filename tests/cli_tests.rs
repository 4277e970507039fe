//! wallet-cli commands against a temporary key store

mod util;

use approval_wallet::cli::{execute, Cli};
use approval_wallet::core::errors::WalletError;
use approval_wallet::core::wallet::import_from_mnemonic;
use approval_wallet::crypto::signing::{recover_address, RecoverableSignature};
use clap::Parser;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;
use util::DEV_PHRASE;

const PASSPHRASE: &str = "correct horse battery";

fn run_with(store: &Path, passphrase: &str, args: &[&str]) -> Result<String, WalletError> {
    let store = store.to_string_lossy().to_string();
    let mut argv = vec!["wallet-cli", "--store", store.as_str(), "--passphrase", passphrase];
    argv.extend_from_slice(args);
    execute(&Cli::parse_from(argv))
}

fn run(store: &Path, args: &[&str]) -> Result<String, WalletError> {
    run_with(store, PASSPHRASE, args)
}

#[test]
fn import_then_sign() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");

    let out = run(&store, &["import", "--phrase", DEV_PHRASE]).unwrap();
    assert!(out.contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    assert!(out.contains("m/44'/60'/0'/0/0"));
    assert!(store.exists());

    let address = run(&store, &["address"]).unwrap();
    assert_eq!(address, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    let signature: RecoverableSignature = run(&store, &["sign", "--message", "APPROVAL_ID:x"])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(recover_address(b"APPROVAL_ID:x", &signature).unwrap().to_string(), address);
}

#[test]
fn import_at_index() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    let out = run(&store, &["import", "--phrase", DEV_PHRASE, "--index", "1"]).unwrap();
    assert!(out.contains("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
}

#[test]
fn negative_index_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    let err = run(&store, &["import", "--phrase", DEV_PHRASE, "--index", "-1"]).unwrap_err();
    assert!(matches!(err, WalletError::InvalidDerivationIndex(_)));
    assert!(!store.exists());
}

#[test]
fn generate_hides_mnemonic_unless_asked() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");

    let quiet = run(&store, &["generate"]).unwrap();
    assert!(quiet.starts_with("address: 0x"));
    assert!(!quiet.contains("mnemonic"));

    let loud = run(&store, &["generate", "--show-mnemonic"]).unwrap();
    let phrase = loud.lines().find_map(|l| l.strip_prefix("mnemonic: ")).unwrap();
    assert_eq!(phrase.split(' ').count(), 12);
}

#[test]
fn derive_lists_consecutive_indices() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    run(&store, &["import", "--phrase", DEV_PHRASE]).unwrap();

    let out = run(&store, &["derive", "--start", "0", "--count", "2"]).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "0\t0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "1\t0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
        ]
    );
}

#[test]
fn logout_removes_keys() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    run(&store, &["import", "--phrase", DEV_PHRASE]).unwrap();
    run(&store, &["logout"]).unwrap();

    let err = run(&store, &["address"]).unwrap_err();
    assert!(matches!(err, WalletError::StorageError(_)));
}

#[test]
fn sign_without_keys_fails() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("missing.json");
    assert!(run(&store, &["sign", "--message", "hi"]).is_err());
}

#[test]
fn stored_keys_are_encrypted() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    run(&store, &["import", "--phrase", DEV_PHRASE]).unwrap();

    let wallet = import_from_mnemonic(DEV_PHRASE, 0).unwrap();
    let on_disk = std::fs::read_to_string(&store).unwrap();
    assert!(!on_disk.contains(&hex::encode(wallet.private_key())));
    assert!(!on_disk.contains("junk"));
}

#[test]
fn wrong_passphrase_cannot_sign() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    run(&store, &["import", "--phrase", DEV_PHRASE]).unwrap();

    let err = run_with(&store, "not the passphrase", &["sign", "--message", "hi"]).unwrap_err();
    assert!(matches!(err, WalletError::StorageError(_)));
    // logout needs no passphrase
    run_with(&store, "not the passphrase", &["logout"]).unwrap();
    assert!(!store.exists());
}

#[test]
fn short_passphrase_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    let err = run_with(&store, "1234", &["generate"]).unwrap_err();
    assert!(matches!(err, WalletError::StorageError(_)));
    assert!(!store.exists());
}

#[test]
fn oversized_derive_count_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    let err = run(&store, &["derive", "--phrase", DEV_PHRASE, "--count", "2147483648"]).unwrap_err();
    assert!(matches!(err, WalletError::InvalidDerivationIndex(_)));
}

#[test]
fn derive_honours_configured_index_limit() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("keys.json");
    let config = dir.path().join("wallet.toml");
    std::fs::write(&config, "[derivation]\nmax_index = 3\n").unwrap();
    let config = config.to_string_lossy().to_string();

    let out = run(&store, &["--config", &config, "derive", "--phrase", DEV_PHRASE, "--count", "4"]).unwrap();
    assert_eq!(out.lines().count(), 4);
    let err = run(&store, &["--config", &config, "derive", "--phrase", DEV_PHRASE, "--count", "5"]).unwrap_err();
    assert!(matches!(err, WalletError::InvalidDerivationIndex(_)));
}
