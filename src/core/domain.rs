//! Domain value types: addresses and amounts.
//!
//! Amounts are carried as integer wei (10^-18 native units) end to end; the
//! decimal strings seen at the edges are parsed and rendered exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::WalletError;
use crate::core::validation::{to_checksum_address, validate_amount_strict, validate_ethereum_address};

/// Decimal places of the native unit
pub const NATIVE_DECIMALS: u32 = 18;

/// Wei per native unit
pub const WEI_PER_NATIVE: u128 = 1_000_000_000_000_000_000;

/// Decimal places accepted for fiat input (cents)
pub const FIAT_DECIMALS: u32 = 2;

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksummed rendering
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        validate_ethereum_address(s)?;
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&s[2..], &mut bytes)
            .map_err(|e| WalletError::InvalidRecipient(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Amount in the smallest indivisible unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_sub(self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Wei)
    }

    /// Exact decimal rendering in native units, without trailing zeros.
    pub fn to_native_string(self) -> String {
        let whole = self.0 / WEI_PER_NATIVE;
        let frac = self.0 % WEI_PER_NATIVE;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:018}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a positive native-unit decimal string (up to 18 places) into wei.
pub fn parse_native_amount(input: &str) -> Result<Wei, WalletError> {
    let input = input.trim();
    validate_amount_strict(input, NATIVE_DECIMALS as usize)?;
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    let whole: u128 = whole
        .parse()
        .map_err(|_| WalletError::InvalidAmount(format!("'{}' is out of range", input)))?;
    let frac_wei: u128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<18}", frac)
            .parse()
            .map_err(|_| WalletError::InvalidAmount(format!("'{}' is out of range", input)))?
    };
    whole
        .checked_mul(WEI_PER_NATIVE)
        .and_then(|w| w.checked_add(frac_wei))
        .map(Wei)
        .ok_or_else(|| WalletError::InvalidAmount(format!("'{}' is out of range", input)))
}

/// Parse a positive fiat decimal string (up to 2 places) into cents.
pub fn parse_fiat_cents(input: &str) -> Result<u64, WalletError> {
    let input = input.trim();
    validate_amount_strict(input, FIAT_DECIMALS as usize)?;
    let value = Decimal::from_str(input)
        .map_err(|e| WalletError::InvalidAmount(format!("'{}': {}", input, e)))?;
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.to_u64())
        .ok_or_else(|| WalletError::InvalidAmount(format!("'{}' is out of range", input)))
}

/// Render cents as a two-place decimal string.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Convert a fiat amount to wei at `fiat_per_native`, rounding down.
pub fn fiat_to_wei(cents: u64, fiat_per_native: Decimal) -> Result<Wei, WalletError> {
    if fiat_per_native <= Decimal::ZERO {
        return Err(WalletError::RateUnavailable(format!(
            "rate {} is not positive",
            fiat_per_native
        )));
    }
    let out_of_range = || WalletError::InvalidAmount(format!("{} cents is out of range", cents));
    // wei = cents * 10^18 / (rate * 100); the 10^18 factor is applied in two
    // steps to stay inside Decimal's 96-bit mantissa.
    let native = Decimal::from(cents)
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|fiat| fiat.checked_div(fiat_per_native))
        .ok_or_else(out_of_range)?;
    let micro = native
        .checked_mul(Decimal::from(1_000_000_000u64))
        .ok_or_else(out_of_range)?;
    let whole_nano = micro.trunc().to_u128().ok_or_else(out_of_range)?;
    let frac_nano = (micro - micro.trunc())
        .checked_mul(Decimal::from(1_000_000_000u64))
        .and_then(|f| f.trunc().to_u128())
        .ok_or_else(out_of_range)?;
    let wei = whole_nano
        .checked_mul(1_000_000_000)
        .and_then(|w| w.checked_add(frac_nano))
        .ok_or_else(out_of_range)?;
    if wei == 0 {
        return Err(WalletError::InvalidAmount(format!(
            "{} is below the smallest transferable unit",
            format_cents(cents)
        )));
    }
    Ok(Wei(wei))
}

/// Unit an amount was entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    #[serde(alias = "ETH", alias = "native")]
    Native,
    #[serde(alias = "USD", alias = "fiat")]
    Fiat,
}

impl FromStr for Unit {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NATIVE" | "ETH" => Ok(Unit::Native),
            "FIAT" | "USD" => Ok(Unit::Fiat),
            other => Err(WalletError::InvalidAmount(format!("unknown unit '{}'", other))),
        }
    }
}

/// Rate snapshot taken when a fiat amount was converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatQuote {
    pub cents: u64,
    /// Fiat units per native unit
    pub rate: Decimal,
}

/// Transfer amount, tagged by the unit it was requested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum TransferAmount {
    Native { wei: Wei },
    Fiat { wei: Wei, quote: FiatQuote },
}

impl TransferAmount {
    pub fn wei(&self) -> Wei {
        match self {
            TransferAmount::Native { wei } | TransferAmount::Fiat { wei, .. } => *wei,
        }
    }

    pub fn native_string(&self) -> String {
        self.wei().to_native_string()
    }

    /// Fiat amount as a two-place string, for fiat-denominated transfers
    pub fn fiat_string(&self) -> Option<String> {
        match self {
            TransferAmount::Native { .. } => None,
            TransferAmount::Fiat { quote, .. } => Some(format_cents(quote.cents)),
        }
    }
}
