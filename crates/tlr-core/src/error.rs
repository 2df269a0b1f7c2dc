/// Core protocol errors.
///
/// Every variant belongs to the "configuration" class: the caller supplied
/// input the network cannot accept. None of them is raised after a mutation
/// has been partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("arithmetic overflow in {op}")]
    Overflow { op: &'static str },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: i128 },

    #[error("network accrues interest but no timestamp was supplied")]
    MissingTimestamp,

    #[error("network uses custom interest rates but no rate was supplied")]
    MissingInterestRate,
}
