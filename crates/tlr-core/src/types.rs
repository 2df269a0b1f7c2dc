use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Signed amount in the smallest unit of a currency network.
///
/// On-chain balances are at most 72 bits wide, so every product formed by the
/// fee and interest math fits in an `i128`; arithmetic is still checked.
pub type Amount = i128;

/// Unix time in seconds.
pub type Timestamp = i64;

/// Length of an account identifier in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identifier.
///
/// The derived `Ord` is byte-lexicographic; the graph uses it to pick the
/// canonical endpoint of every trustline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address whose trailing bytes hold `value` big-endian.
    /// Handy for fixtures and tooling where readable ids matter.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| CoreError::InvalidAddress(format!("{s}: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = raw.try_into().map_err(|raw: Vec<u8>| {
            CoreError::InvalidAddress(format!(
                "{s}: expected {ADDRESS_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which side of a transfer bears the mediation fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePayer {
    /// The sender sends `value + fee`; the receiver gets exactly `value`.
    Sender,
    /// The sender sends exactly `value`; the receiver gets `value - fee`.
    Receiver,
}

impl fmt::Display for FeePayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => write!(f, "sender"),
            Self::Receiver => write!(f, "receiver"),
        }
    }
}

/// Result of a routing query. An empty `path` with `fee == 0` means no route
/// exists under the requested constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPath {
    /// Total mediation fee.
    pub fee: Amount,
    /// Ordered hops including source and target.
    pub path: Vec<Address>,
    /// Value the path was computed for.
    pub value: Amount,
    /// Who pays `fee`.
    pub fee_payer: FeePayer,
    /// Gas estimate, filled in by the relaying layer.
    pub estimated_gas: Option<u64>,
}

impl PaymentPath {
    pub fn new(fee: Amount, path: Vec<Address>, value: Amount, fee_payer: FeePayer) -> Self {
        Self {
            fee,
            path,
            value,
            fee_payer,
            estimated_gas: None,
        }
    }

    /// The "no route" result for a query of `value`.
    pub fn not_found(value: Amount, fee_payer: FeePayer) -> Self {
        Self::new(0, Vec::new(), value, fee_payer)
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of edges the payment crosses.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Intermediate accounts (everyone except the first and last entry).
    pub fn mediators(&self) -> &[Address] {
        if self.path.len() < 3 {
            return &[];
        }
        &self.path[1..self.path.len() - 1]
    }
}
