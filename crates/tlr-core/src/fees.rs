//! Capacity imbalance fees.
//!
//! A mediator charges only on the part of a transfer that grows the debt on
//! its edge; the part that pays down an existing debt is free. These formulas
//! reproduce the currency network contract exactly and use integer division
//! only.

use crate::error::CoreError;
use crate::types::Amount;

/// Portion of `value` that increases the imbalance on an edge whose current
/// balance (amount the receiving side owes the sending side) is `balance`.
pub fn imbalance_generated(balance: Amount, value: Amount) -> Amount {
    debug_assert!(value >= 0, "transfer value must not be negative");
    if balance > 0 {
        (value - balance).max(0)
    } else {
        value
    }
}

/// Fee charged on `imbalance` when the sent amount is known.
///
/// Zero iff there is no imbalance or fees are disabled (`divisor == 0`);
/// otherwise at least 1.
pub fn calculate_fee(imbalance: Amount, divisor: u64) -> Amount {
    if imbalance == 0 || divisor == 0 {
        return 0;
    }
    imbalance / Amount::from(divisor) + 1
}

/// Fee charged when the amount arriving after the fee is known and the sent
/// amount has to be inferred.
///
/// For any received amount `r`, `calculate_fee(r + f, d) == f` where
/// `f = calculate_fee_reverse(r, d)`.
pub fn calculate_fee_reverse(imbalance: Amount, divisor: u64) -> Result<Amount, CoreError> {
    if imbalance == 0 || divisor == 0 {
        return Ok(0);
    }
    if divisor == 1 {
        return Err(CoreError::InvalidConfig(
            "fee divisor 1 has no reverse fee".into(),
        ));
    }
    Ok(imbalance / Amount::from(divisor - 1) + 1)
}
