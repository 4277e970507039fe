use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::errors::WalletError;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,

    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,

    /// Comma-separated list of allowed CORS origins
    #[serde(default = "ServerConfig::default_cors_origin")]
    pub cors_origin: String,

    /// Requests allowed per rate-limit window
    #[serde(default = "ServerConfig::default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Rate-limit window (seconds)
    #[serde(default = "ServerConfig::default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

impl ServerConfig {
    fn default_host() -> String { "0.0.0.0".to_string() }
    fn default_port() -> u16 { 8888 }
    fn default_cors_origin() -> String { "http://localhost:5173".to_string() }
    fn default_rate_limit_requests() -> u32 { 100 }
    fn default_rate_limit_window_secs() -> u64 { 60 }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            cors_origin: Self::default_cors_origin(),
            rate_limit_requests: Self::default_rate_limit_requests(),
            rate_limit_window_secs: Self::default_rate_limit_window_secs(),
        }
    }
}

/// Approval lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Lifetime of a pending approval (seconds)
    #[serde(default = "ApprovalConfig::default_ttl_secs")]
    pub ttl_secs: u64,

    /// Grace added to `expires_at` when executing (seconds). 0 = strict.
    #[serde(default)]
    pub clock_skew_tolerance_secs: u64,

    /// How long terminal approvals are kept before collection (seconds)
    #[serde(default = "ApprovalConfig::default_retention_secs")]
    pub retention_secs: u64,

    /// Interval of the background sweep (seconds)
    #[serde(default = "ApprovalConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Largest accepted drift of a fiat quote between prepare and execute,
    /// in basis points of the quoted amount
    #[serde(default = "ApprovalConfig::default_max_fiat_slippage_bps")]
    pub max_fiat_slippage_bps: u32,
}

impl ApprovalConfig {
    fn default_ttl_secs() -> u64 { 60 }
    fn default_retention_secs() -> u64 { 300 }
    fn default_sweep_interval_secs() -> u64 { 30 }
    fn default_max_fiat_slippage_bps() -> u32 { 100 }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            clock_skew_tolerance_secs: 0,
            retention_secs: Self::default_retention_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
            max_fiat_slippage_bps: Self::default_max_fiat_slippage_bps(),
        }
    }
}

/// Ledger seeding configuration, in native units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "LedgerConfig::default_seed_min")]
    pub seed_min_native: String,

    #[serde(default = "LedgerConfig::default_seed_max")]
    pub seed_max_native: String,
}

impl LedgerConfig {
    fn default_seed_min() -> String { "1".to_string() }
    fn default_seed_max() -> String { "10".to_string() }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            seed_min_native: Self::default_seed_min(),
            seed_max_native: Self::default_seed_max(),
        }
    }
}

/// Derivation path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Highest address index accepted by `import_from_mnemonic`
    #[serde(default = "DerivationConfig::default_max_index")]
    pub max_index: u32,
}

impl DerivationConfig {
    fn default_max_index() -> u32 { crate::core::bip44::MAX_DERIVATION_INDEX }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self { max_index: Self::default_max_index() }
    }
}

/// Fiat rate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    #[serde(default = "RateConfig::default_fiat_symbol")]
    pub fiat_symbol: String,

    /// Fiat units per one native unit, as a decimal string
    #[serde(default = "RateConfig::default_fiat_per_native")]
    pub fiat_per_native: String,
}

impl RateConfig {
    fn default_fiat_symbol() -> String { "USD".to_string() }
    fn default_fiat_per_native() -> String { "3000".to_string() }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            fiat_symbol: Self::default_fiat_symbol(),
            fiat_per_native: Self::default_fiat_per_native(),
        }
    }
}

/// Top-level configuration, one section per component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub approvals: ApprovalConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub derivation: DerivationConfig,
    #[serde(default)]
    pub rates: RateConfig,
}

impl WalletConfig {
    /// Parse a TOML document. Missing sections and fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, WalletError> {
        let config: WalletConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WalletError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.approvals.ttl_secs == 0 {
            return Err(WalletError::ConfigError("approvals.ttl_secs must be positive".into()));
        }
        if self.approvals.max_fiat_slippage_bps > 10_000 {
            return Err(WalletError::ConfigError(
                "approvals.max_fiat_slippage_bps must not exceed 10000".into(),
            ));
        }
        if self.derivation.max_index > crate::core::bip44::MAX_DERIVATION_INDEX {
            return Err(WalletError::ConfigError(format!(
                "derivation.max_index must not exceed {}",
                crate::core::bip44::MAX_DERIVATION_INDEX
            )));
        }
        let min = crate::core::domain::parse_native_amount(&self.ledger.seed_min_native)
            .map_err(|e| WalletError::ConfigError(format!("ledger.seed_min_native: {}", e)))?;
        let max = crate::core::domain::parse_native_amount(&self.ledger.seed_max_native)
            .map_err(|e| WalletError::ConfigError(format!("ledger.seed_max_native: {}", e)))?;
        if min > max {
            return Err(WalletError::ConfigError(
                "ledger.seed_min_native must not exceed ledger.seed_max_native".into(),
            ));
        }
        Ok(())
    }
}
