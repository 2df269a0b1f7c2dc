//! JSON query protocol served over stdin/stdout.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tlr_core::{Address, Amount, FeePayer, PaymentPath, Timestamp};
use tlr_routing::{
    AccountSummary, CapacityRequest, CurrencyNetwork, RoutingError, TransferRequest,
    TriangulationRequest,
};

use crate::config::RoutingConfig;

fn default_fee_payer() -> FeePayer {
    FeePayer::Sender
}

/// One query, tagged by kind: `{"transfer": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
        #[serde(default = "default_fee_payer")]
        fee_payer: FeePayer,
        #[serde(default)]
        max_hops: Option<usize>,
        #[serde(default)]
        max_fees: Option<Amount>,
        #[serde(default)]
        now: Option<Timestamp>,
    },
    MaxCapacity {
        from: Address,
        to: Address,
        #[serde(default)]
        max_hops: Option<usize>,
        #[serde(default)]
        now: Option<Timestamp>,
    },
    Close {
        user: Address,
        counter_party: Address,
        #[serde(default)]
        max_hops: Option<usize>,
        #[serde(default)]
        max_fees: Option<Amount>,
        #[serde(default)]
        now: Option<Timestamp>,
    },
    Friends {
        user: Address,
    },
    Summary {
        user: Address,
        #[serde(default)]
        counter_party: Option<Address>,
        #[serde(default)]
        now: Option<Timestamp>,
    },
}

/// Answer to one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    Path(PaymentPath),
    Capacity { capacity: Amount, path: Vec<Address> },
    Friends(Vec<Address>),
    Summary(AccountSummary),
    Error { kind: ErrorKind, message: String },
}

/// Error classes a client can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The line was not a valid query.
    BadRequest,
    UnknownNode,
    Configuration,
    Timeout,
    Internal,
}

impl From<&RoutingError> for ErrorKind {
    fn from(err: &RoutingError) -> Self {
        match err {
            RoutingError::UnknownNode(_) => Self::UnknownNode,
            RoutingError::Configuration(_) => Self::Configuration,
            RoutingError::Timeout { .. } => Self::Timeout,
            RoutingError::NoPathFound | RoutingError::InvariantViolation(_) => Self::Internal,
        }
    }
}

impl QueryResult {
    fn error(kind: ErrorKind, message: impl ToString) -> Self {
        Self::Error {
            kind,
            message: message.to_string(),
        }
    }

    fn from_routing(err: RoutingError) -> Self {
        Self::error(ErrorKind::from(&err), err)
    }
}

/// One line written back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub query_id: Uuid,
    pub result: QueryResult,
}

impl Response {
    pub fn new(result: QueryResult) -> Self {
        Self {
            query_id: Uuid::now_v7(),
            result,
        }
    }

    /// Response for a line that could not be parsed.
    pub fn bad_request(err: impl ToString) -> Self {
        Self::new(QueryResult::error(ErrorKind::BadRequest, err))
    }
}

/// Settings every query inherits.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryDefaults {
    pub max_hops: Option<usize>,
    pub timeout: Option<Duration>,
}

impl From<&RoutingConfig> for QueryDefaults {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            max_hops: config.default_max_hops,
            timeout: config.query_timeout(),
        }
    }
}

fn current_time() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Run `query` synchronously against `network`.
pub fn execute(network: &CurrencyNetwork, query: &Query, defaults: QueryDefaults) -> QueryResult {
    let timeout = defaults.timeout;
    match *query {
        Query::Transfer {
            from,
            to,
            value,
            fee_payer,
            max_hops,
            max_fees,
            now,
        } => {
            let request = TransferRequest {
                source: from,
                target: to,
                value,
                max_hops: max_hops.or(defaults.max_hops),
                max_fees,
                fee_payer,
                now: now.unwrap_or_else(current_time),
            };
            network
                .find_transfer_path(&request, timeout)
                .map_or_else(QueryResult::from_routing, QueryResult::Path)
        }
        Query::MaxCapacity {
            from,
            to,
            max_hops,
            now,
        } => {
            let request = CapacityRequest {
                source: from,
                target: to,
                max_hops: max_hops.or(defaults.max_hops),
                now: now.unwrap_or_else(current_time),
            };
            match network.find_maximum_capacity_path(&request, timeout) {
                Ok((capacity, path)) => QueryResult::Capacity { capacity, path },
                Err(err) => QueryResult::from_routing(err),
            }
        }
        Query::Close {
            user,
            counter_party,
            max_hops,
            max_fees,
            now,
        } => {
            let request = TriangulationRequest {
                source: user,
                target: counter_party,
                max_hops: max_hops.or(defaults.max_hops),
                max_fees,
                now: now.unwrap_or_else(current_time),
            };
            network
                .close_trustline_via_triangulation(&request, timeout)
                .map_or_else(QueryResult::from_routing, QueryResult::Path)
        }
        Query::Friends { user } => QueryResult::Friends(network.query_friends(user)),
        Query::Summary {
            user,
            counter_party,
            now,
        } => network
            .query_account_summary(user, counter_party, now.unwrap_or_else(current_time))
            .map_or_else(
                |err| QueryResult::error(ErrorKind::Configuration, err),
                QueryResult::Summary,
            ),
    }
}

/// Run `query` on the blocking pool so searches never stall the runtime.
pub async fn run_query(
    network: Arc<CurrencyNetwork>,
    query: Query,
    defaults: QueryDefaults,
) -> Response {
    let result = tokio::task::spawn_blocking(move || execute(&network, &query, defaults))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "query task failed");
            QueryResult::error(ErrorKind::Internal, e)
        });
    let response = Response::new(result);
    tracing::debug!(query_id = %response.query_id, "query answered");
    response
}
