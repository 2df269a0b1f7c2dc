//! TLR Routing: trustline graph mirror and payment path search.
//!
//! This crate provides:
//! - [`TrustlineGraph`]: the in-memory mirror of one currency network, fed by
//!   [`TrustlineEvent`]s and [`TrustlineSnapshot`]s.
//! - [`CostAccumulator`] and its strategies [`SenderPays`], [`ReceiverPays`] and
//!   [`MaxCapacity`].
//! - [`least_cost_path`]: the generic priority-queue search they drive.
//! - [`PathFinder`]: transfer, maximum capacity and triangulation queries.
//! - [`CurrencyNetwork`]: a graph behind a single-writer/multi-reader lock.

pub mod accumulator;
pub mod error;
pub mod events;
pub mod graph;
pub mod network;
pub mod pathfinder;
pub mod search;
pub mod summary;
pub mod trustline;

// Re-exports for convenience.
pub use accumulator::{
    cost_for_path, CostAccumulator, MaxCapacity, MaxCapacityCost, ReceiverPays,
    ReceiverPaysCost, SearchDirection, SearchLimits, SenderPays, SenderPaysCost,
};
pub use error::RoutingError;
pub use events::{BalanceUpdate, TrustlineEvent, TrustlineSnapshot, TrustlineUpdate};
pub use graph::TrustlineGraph;
pub use network::CurrencyNetwork;
pub use pathfinder::{CapacityRequest, PathFinder, TransferRequest, TriangulationRequest};
pub use search::{least_cost_path, Deadline};
pub use summary::AccountSummary;
pub use trustline::{AccountView, Trustline};
