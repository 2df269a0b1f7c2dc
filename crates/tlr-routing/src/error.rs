use tlr_core::{Address, CoreError};

/// Errors that can occur within the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// No path satisfies the query's constraints. Callers facing users turn
    /// this into an empty `PaymentPath`.
    #[error("no path found")]
    NoPathFound,

    #[error("unknown account: {0}")]
    UnknownNode(Address),

    #[error("configuration error: {0}")]
    Configuration(#[from] CoreError),

    #[error("query timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl RoutingError {
    /// Whether the caller supplied input the network cannot accept.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
