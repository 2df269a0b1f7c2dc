//! Inputs fed to the graph by the chain indexer.

use serde::{Deserialize, Serialize};
use tlr_core::{Address, Amount, Timestamp};

/// Full state of one trustline, seen from `user`. A list of these replaces
/// the whole graph on (re)sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineSnapshot {
    pub user: Address,
    pub counter_party: Address,
    pub creditline_given: Amount,
    pub creditline_received: Amount,
    #[serde(default)]
    pub interest_rate_given: i64,
    #[serde(default)]
    pub interest_rate_received: i64,
    #[serde(default)]
    pub is_frozen: bool,
    /// Amount `counter_party` owes `user` as of `m_time`.
    #[serde(default)]
    pub balance: Amount,
    #[serde(default)]
    pub m_time: Timestamp,
}

/// A trustline was opened, changed, frozen or unfrozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineUpdate {
    pub creditor: Address,
    pub debtor: Address,
    pub creditline_given: Amount,
    pub creditline_received: Amount,
    #[serde(default)]
    pub interest_rate_given: Option<i64>,
    #[serde(default)]
    pub interest_rate_received: Option<i64>,
    #[serde(default)]
    pub is_frozen: bool,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// The balance between two accounts changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub from: Address,
    pub to: Address,
    /// Amount `to` owes `from`.
    pub balance: Amount,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// One entry of the ordered event stream.
///
/// Externally tagged so amounts beyond 64 bits survive JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustlineEvent {
    TrustlineUpdate(TrustlineUpdate),
    BalanceUpdate(BalanceUpdate),
}

impl TrustlineEvent {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::TrustlineUpdate(update) => update.timestamp,
            Self::BalanceUpdate(update) => update.timestamp,
        }
    }

    /// The two accounts the event touches.
    pub fn accounts(&self) -> (Address, Address) {
        match self {
            Self::TrustlineUpdate(update) => (update.creditor, update.debtor),
            Self::BalanceUpdate(update) => (update.from, update.to),
        }
    }
}
