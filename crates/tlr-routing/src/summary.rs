use serde::{Deserialize, Serialize};
use tlr_core::{Amount, CoreError};

/// Point-in-time view of one account, either on a single trustline or summed
/// over all of its trustlines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Net amount owed to the account, including interest.
    pub balance: Amount,
    /// Part of `balance` that sits on frozen trustlines.
    pub frozen_balance: Amount,
    /// Sum of limits the account grants, over trustlines that are not frozen.
    pub creditline_given: Amount,
    /// Sum of limits the account received, over trustlines that are not frozen.
    pub creditline_received: Amount,
    /// Only meaningful for a single trustline.
    pub interest_rate_given: i64,
    /// Only meaningful for a single trustline.
    pub interest_rate_received: i64,
    pub is_frozen: bool,
}

impl AccountSummary {
    /// Balance on trustlines that can still move.
    pub fn spendable_balance(&self) -> Result<Amount, CoreError> {
        self.balance
            .checked_sub(self.frozen_balance)
            .ok_or(CoreError::Overflow { op: "spendable balance" })
    }

    /// How much more counterparties may still borrow from the account.
    /// Zero on a frozen trustline.
    pub fn creditline_left_given(&self) -> Result<Amount, CoreError> {
        if self.is_frozen {
            return Ok(0);
        }
        self.creditline_given
            .checked_sub(self.spendable_balance()?)
            .ok_or(CoreError::Overflow { op: "creditline left given" })
    }

    /// How much more the account may still borrow. Zero on a frozen
    /// trustline.
    pub fn creditline_left_received(&self) -> Result<Amount, CoreError> {
        if self.is_frozen {
            return Ok(0);
        }
        self.creditline_received
            .checked_add(self.spendable_balance()?)
            .ok_or(CoreError::Overflow { op: "creditline left received" })
    }

    /// Amount the account can send right now, ignoring mediation fees.
    pub fn available(&self) -> Result<Amount, CoreError> {
        self.creditline_left_received()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_amounts() {
        let summary = AccountSummary {
            balance: 20,
            creditline_given: 100,
            creditline_received: 150,
            ..Default::default()
        };
        assert_eq!(summary.creditline_left_given().unwrap(), 80);
        assert_eq!(summary.creditline_left_received().unwrap(), 170);
        assert_eq!(summary.available().unwrap(), 170);
    }

    #[test]
    fn test_frozen_balance_is_not_spendable() {
        let summary = AccountSummary {
            balance: 50,
            frozen_balance: 30,
            creditline_received: 100,
            ..Default::default()
        };
        assert_eq!(summary.spendable_balance().unwrap(), 20);
        assert_eq!(summary.available().unwrap(), 120);
    }

    #[test]
    fn test_frozen_trustline_has_nothing_left() {
        let summary = AccountSummary {
            balance: 20,
            frozen_balance: 20,
            creditline_given: 100,
            creditline_received: 150,
            is_frozen: true,
            ..Default::default()
        };
        assert_eq!(summary.creditline_left_given().unwrap(), 0);
        assert_eq!(summary.creditline_left_received().unwrap(), 0);
        assert_eq!(summary.available().unwrap(), 0);
    }

    #[test]
    fn test_left_amounts_overflow() {
        let summary = AccountSummary {
            balance: 5,
            creditline_given: 0,
            creditline_received: Amount::MAX,
            ..Default::default()
        };
        assert!(matches!(
            summary.available(),
            Err(CoreError::Overflow { .. })
        ));
        assert_eq!(summary.creditline_left_given().unwrap(), -5);

        let debtor = AccountSummary {
            balance: -5,
            creditline_given: Amount::MAX,
            ..Default::default()
        };
        assert!(debtor.creditline_left_given().is_err());
    }
}
