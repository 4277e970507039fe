use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::core::config::WalletConfig;
use crate::core::errors::WalletError;
use crate::core::wallet::{self, recover::normalize_phrase};
use crate::crypto::signing::address_from_private_key;
use crate::security::credentials::{
    persist_wallet, sign_with, CredentialProvider, FileKeyStore, MNEMONIC_SLOT, PRIVATE_KEY_SLOT,
};

/// Client-side wallet tool: key generation, import and approval signing
#[derive(Debug, Parser)]
#[command(name = "wallet-cli", about = "Approval wallet CLI", disable_help_subcommand = true)]
pub struct Cli {
    /// Key store file
    #[arg(long, global = true, default_value = "wallet-keys.json")]
    pub store: PathBuf,

    /// Optional TOML configuration (derivation limits)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key store passphrase; read from WALLET_PASSPHRASE when omitted
    #[arg(long, global = true)]
    pub passphrase: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new wallet and store its keys
    Generate {
        /// Also print the recovery phrase
        #[arg(long)]
        show_mnemonic: bool,
    },
    /// Restore a wallet from a recovery phrase and store its keys
    Import {
        /// Recovery phrase; read from WALLET_MNEMONIC when omitted
        #[arg(long)]
        phrase: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        index: i64,
    },
    /// Print the stored wallet's address
    Address,
    /// Sign a message (e.g. an approval) with the stored key
    Sign {
        #[arg(long)]
        message: String,
    },
    /// List addresses derived from the stored (or given) phrase
    Derive {
        #[arg(long)]
        phrase: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
    /// Remove stored keys
    Logout,
}

const PASSPHRASE_ENV: &str = "WALLET_PASSPHRASE";

fn load_config(cli: &Cli) -> Result<WalletConfig, WalletError> {
    match &cli.config {
        Some(path) => WalletConfig::load(path),
        None => Ok(WalletConfig::default()),
    }
}

fn stored_phrase(store: &dyn CredentialProvider) -> Result<String, WalletError> {
    let bytes = store
        .load(MNEMONIC_SLOT)?
        .ok_or_else(|| WalletError::StorageError("no recovery phrase stored".into()))?;
    std::str::from_utf8(&bytes)
        .map(normalize_phrase)
        .map_err(|_| WalletError::StorageError("stored recovery phrase is not UTF-8".into()))
}

fn open_store(cli: &Cli) -> Result<FileKeyStore, WalletError> {
    let passphrase = match &cli.passphrase {
        Some(p) => Zeroizing::new(p.clone()),
        None => Zeroizing::new(std::env::var(PASSPHRASE_ENV).map_err(|_| {
            WalletError::StorageError(format!("pass --passphrase or set {}", PASSPHRASE_ENV))
        })?),
    };
    FileKeyStore::new(&cli.store, &passphrase)
}

/// Run one command and return what should be printed.
pub fn execute(cli: &Cli) -> Result<String, WalletError> {
    let config = load_config(cli)?;

    match &cli.command {
        Commands::Generate { show_mnemonic } => {
            let store = open_store(cli)?;
            let wallet = wallet::generate()?;
            persist_wallet(&store, &wallet)?;
            let mut out = format!("address: {}\npath: {}", wallet.address(), wallet.path());
            if *show_mnemonic {
                out.push_str(&format!("\nmnemonic: {}", wallet.mnemonic()));
            }
            Ok(out)
        }
        Commands::Import { phrase, index } => {
            let phrase = match phrase {
                Some(p) => p.clone(),
                None => std::env::var("WALLET_MNEMONIC").map_err(|_| {
                    WalletError::InvalidMnemonic("pass --phrase or set WALLET_MNEMONIC".into())
                })?,
            };
            let wallet = wallet::import_with_limit(&phrase, *index, config.derivation.max_index)?;
            persist_wallet(&open_store(cli)?, &wallet)?;
            Ok(format!("address: {}\npath: {}", wallet.address(), wallet.path()))
        }
        Commands::Address => {
            let key = open_store(cli)?
                .load(PRIVATE_KEY_SLOT)?
                .ok_or_else(|| WalletError::StorageError("no private key stored".into()))?;
            Ok(address_from_private_key(&key)?.to_string())
        }
        Commands::Sign { message } => Ok(sign_with(&open_store(cli)?, message.as_bytes())?.to_string()),
        Commands::Derive { phrase, start, count } => {
            let phrase = match phrase {
                Some(p) => p.clone(),
                None => stored_phrase(&open_store(cli)?)?,
            };
            let max_index = config.derivation.max_index;
            let lines = wallet::derive_addresses_with_limit(&phrase, *start, *count, max_index)?
                .into_iter()
                .map(|(index, address)| format!("{}\t{}", index, address))
                .collect::<Vec<_>>();
            Ok(lines.join("\n"))
        }
        Commands::Logout => {
            FileKeyStore::wipe(&cli.store)?;
            Ok("keys removed".to_string())
        }
    }
}
