//! Core type definitions for the fee pool
//!
//! Amounts are 18-decimal fixed-point `u128` values; timestamps are Unix
//! seconds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Monotonically increasing fee period identifier
pub type PeriodId = u64;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// 18-decimal fixed-point amount
pub type Amount = u128;

/// AccountId - identifier of a debt participant, relayer, owner or delegate
///
/// Serialized as a 64-character hex string so it reads naturally in TOML
/// configuration and JSON event exports.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId {
    id: [u8; 32],
}

impl AccountId {
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    /// Derive an account id from a public key using BLAKE3
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let hash = blake3::hash(public_key);
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self { id })
    }

    /// Null account
    pub const ZERO: Self = Self { id: [0u8; 32] };
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Subsystem sections that can be suspended independently
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Whole-system pause
    System,
    /// Issuing, burning and claiming
    Issuance,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Issuance => write!(f, "issuance"),
        }
    }
}

/// What a payout is denominated in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// Trading fee revenue
    Fees,
    /// Emission / inflationary rewards
    Rewards,
    /// Liquidation rewards from the accumulator stream
    LiquidationRewards,
}

/// A single leg of a settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub asset: Asset,
    pub amount: Amount,
}

impl Payout {
    pub fn new(asset: Asset, amount: Amount) -> Self {
        Self { asset, amount }
    }
}

/// Key of a priced currency whose rate freshness gates claims
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyKey(String);

impl CurrencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CurrencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyKey({})", self.0)
    }
}

impl fmt::Display for CurrencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
