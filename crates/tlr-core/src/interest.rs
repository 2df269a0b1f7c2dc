//! Interest accrual on trustline balances.
//!
//! The currency network contract approximates continuous compounding with a
//! truncated Taylor series evaluated in integer arithmetic. Every term is
//! truncated toward zero before it feeds the next one, exactly as the EVM
//! does, so results agree with the chain to the last unit.

use crate::error::CoreError;
use crate::types::{Amount, Timestamp};

pub const SECONDS_PER_YEAR: i128 = 60 * 60 * 24 * 365;

/// Interest rates are expressed in 0.01% per year.
const RATE_DENOMINATOR: i128 = 100 * 100;

/// Highest order of the Taylor expansion the contract evaluates.
const HIGHEST_ORDER: i128 = 15;

/// Interest owed on `balance` at `rate_bps` over `elapsed` seconds.
///
/// Negative `elapsed` (an event timestamp ahead of `now`) accrues nothing.
pub fn calculate_interest(
    balance: Amount,
    rate_bps: i64,
    elapsed: Timestamp,
) -> Result<Amount, CoreError> {
    if balance == 0 || rate_bps == 0 || elapsed <= 0 {
        return Ok(0);
    }
    let factor = Amount::from(rate_bps)
        .checked_mul(Amount::from(elapsed))
        .ok_or(CoreError::Overflow { op: "interest factor" })?;

    let mut term = balance;
    let mut interest: Amount = 0;
    for order in 1..=HIGHEST_ORDER {
        let numerator = term
            .checked_mul(factor)
            .ok_or(CoreError::Overflow { op: "interest term" })?;
        term = numerator / (SECONDS_PER_YEAR * RATE_DENOMINATOR * order);
        if term == 0 {
            break;
        }
        interest = interest
            .checked_add(term)
            .ok_or(CoreError::Overflow { op: "interest sum" })?;
    }
    Ok(interest)
}

/// `balance` after accruing interest for `elapsed` seconds, seen from the
/// party that `balance` is owed to when positive.
///
/// The rate set by the creditor applies: `rate_given` while the counterparty
/// owes (`balance > 0`), `rate_received` otherwise.
pub fn balance_with_interest(
    balance: Amount,
    rate_given: i64,
    rate_received: i64,
    elapsed: Timestamp,
) -> Result<Amount, CoreError> {
    let rate = if balance >= 0 { rate_given } else { rate_received };
    let interest = calculate_interest(balance, rate, elapsed)?;
    balance
        .checked_add(interest)
        .ok_or(CoreError::Overflow { op: "balance with interest" })
}
