//! Fiat exchange rate source.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::config::RateConfig;
use crate::core::errors::WalletError;

/// Supplies the fiat price of one native unit.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// Fiat units per native unit. Must be positive.
    async fn fiat_per_native(&self) -> Result<Decimal, WalletError>;

    fn fiat_symbol(&self) -> &str;
}

/// Oracle that always answers with a configured rate.
#[derive(Debug, Clone)]
pub struct FixedRateOracle {
    symbol: String,
    rate: Option<Decimal>,
}

impl FixedRateOracle {
    pub fn new(symbol: impl Into<String>, rate: Decimal) -> Self {
        Self { symbol: symbol.into(), rate: Some(rate) }
    }

    /// Oracle with no rate; every quote fails with `RateUnavailable`.
    pub fn unavailable(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), rate: None }
    }

    pub fn from_config(config: &RateConfig) -> Result<Self, WalletError> {
        let rate = Decimal::from_str(config.fiat_per_native.trim()).map_err(|e| {
            WalletError::ConfigError(format!("rates.fiat_per_native: {}", e))
        })?;
        Ok(Self::new(config.fiat_symbol.clone(), rate))
    }
}

#[async_trait]
impl RateOracle for FixedRateOracle {
    async fn fiat_per_native(&self) -> Result<Decimal, WalletError> {
        match self.rate {
            Some(rate) if rate > Decimal::ZERO => Ok(rate),
            Some(rate) => Err(WalletError::RateUnavailable(format!(
                "{} rate {} is not positive",
                self.symbol, rate
            ))),
            None => Err(WalletError::RateUnavailable(format!("no {} rate configured", self.symbol))),
        }
    }

    fn fiat_symbol(&self) -> &str {
        &self.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_rate_from_default_config() {
        let oracle = FixedRateOracle::from_config(&RateConfig::default()).unwrap();
        assert_eq!(oracle.fiat_per_native().await.unwrap(), Decimal::from(3000));
        assert_eq!(oracle.fiat_symbol(), "USD");
    }

    #[tokio::test]
    async fn test_bad_rates() {
        let zero = FixedRateOracle::new("USD", Decimal::ZERO);
        assert!(matches!(zero.fiat_per_native().await, Err(WalletError::RateUnavailable(_))));
        let none = FixedRateOracle::unavailable("USD");
        assert!(matches!(none.fiat_per_native().await, Err(WalletError::RateUnavailable(_))));
    }

    #[test]
    fn test_unparseable_config_rate() {
        let cfg = RateConfig { fiat_symbol: "USD".into(), fiat_per_native: "abc".into() };
        assert!(matches!(FixedRateOracle::from_config(&cfg), Err(WalletError::ConfigError(_))));
    }
}
