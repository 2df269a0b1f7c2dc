use std::time::Duration;

use parking_lot::RwLock;
use tlr_core::{Address, Amount, CoreError, NetworkConfig, PaymentPath, Timestamp};

use crate::error::RoutingError;
use crate::events::{BalanceUpdate, TrustlineEvent, TrustlineSnapshot, TrustlineUpdate};
use crate::graph::TrustlineGraph;
use crate::pathfinder::{CapacityRequest, PathFinder, TransferRequest, TriangulationRequest};
use crate::search::Deadline;
use crate::summary::AccountSummary;

#[derive(Debug)]
struct NetworkState {
    graph: TrustlineGraph,
    /// Timestamp of the newest event applied so far.
    last_event_at: Option<Timestamp>,
}

/// One currency network shared between the ingestion writer and any number
/// of query threads.
///
/// Each mutation holds the write lock for a single edge update. Each query
/// holds one read lock for its whole search, so every hop of a path is read
/// from the same state.
#[derive(Debug)]
pub struct CurrencyNetwork {
    config: NetworkConfig,
    state: RwLock<NetworkState>,
}

impl CurrencyNetwork {
    pub fn new(config: NetworkConfig) -> Result<Self, CoreError> {
        let graph = TrustlineGraph::new(config)?;
        Ok(Self {
            config,
            state: RwLock::new(NetworkState {
                graph,
                last_event_at: None,
            }),
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Replace the whole graph. The new graph is built before the lock is
    /// taken, so readers only wait for the swap.
    pub fn apply_full_sync<I>(&self, snapshots: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = TrustlineSnapshot>,
    {
        let graph = TrustlineGraph::from_snapshots(self.config, snapshots)?;
        let mut state = self.state.write();
        state.graph = graph;
        tracing::info!(
            accounts = state.graph.node_count(),
            trustlines = state.graph.trustline_count(),
            "full sync applied"
        );
        Ok(())
    }

    pub fn apply_trustline_update(&self, update: &TrustlineUpdate) -> Result<(), CoreError> {
        let mut state = self.state.write();
        state.graph.update_trustline(update)?;
        state.observe(update.timestamp);
        Ok(())
    }

    pub fn apply_balance_update(&self, update: &BalanceUpdate) -> Result<(), CoreError> {
        let mut state = self.state.write();
        state
            .graph
            .update_balance(update.from, update.to, update.balance, update.timestamp)?;
        state.observe(update.timestamp);
        Ok(())
    }

    pub fn apply_event(&self, event: &TrustlineEvent) -> Result<(), CoreError> {
        match event {
            TrustlineEvent::TrustlineUpdate(update) => self.apply_trustline_update(update),
            TrustlineEvent::BalanceUpdate(update) => self.apply_balance_update(update),
        }
    }

    pub fn last_event_at(&self) -> Option<Timestamp> {
        self.state.read().last_event_at
    }

    pub fn query_friends(&self, user: Address) -> Vec<Address> {
        self.state.read().graph.get_friends(user)
    }

    pub fn query_account_summary(
        &self,
        user: Address,
        counter_party: Option<Address>,
        now: Timestamp,
    ) -> Result<AccountSummary, CoreError> {
        self.state
            .read()
            .graph
            .get_account_summary(user, counter_party, now)
    }

    pub fn query_balance(
        &self,
        a: Address,
        b: Address,
        now: Timestamp,
    ) -> Result<Amount, CoreError> {
        self.state.read().graph.get_balance_with_interest(a, b, now)
    }

    pub fn find_transfer_path(
        &self,
        request: &TransferRequest,
        timeout: Option<Duration>,
    ) -> Result<PaymentPath, RoutingError> {
        let deadline = Deadline::from_timeout(timeout);
        self.with_graph(|graph| {
            PathFinder::new(graph)
                .with_deadline(deadline)
                .find_transfer_path(request)
        })
    }

    pub fn find_maximum_capacity_path(
        &self,
        request: &CapacityRequest,
        timeout: Option<Duration>,
    ) -> Result<(Amount, Vec<Address>), RoutingError> {
        let deadline = Deadline::from_timeout(timeout);
        self.with_graph(|graph| {
            PathFinder::new(graph)
                .with_deadline(deadline)
                .find_maximum_capacity_path(request)
        })
    }

    pub fn close_trustline_via_triangulation(
        &self,
        request: &TriangulationRequest,
        timeout: Option<Duration>,
    ) -> Result<PaymentPath, RoutingError> {
        let deadline = Deadline::from_timeout(timeout);
        self.with_graph(|graph| {
            PathFinder::new(graph)
                .with_deadline(deadline)
                .close_trustline_via_triangulation(request)
        })
    }

    /// Export every trustline; feeding the result to
    /// [`CurrencyNetwork::apply_full_sync`] restores the current state.
    pub fn snapshot(&self) -> Vec<TrustlineSnapshot> {
        self.state.read().graph.snapshot()
    }

    pub fn node_count(&self) -> usize {
        self.state.read().graph.node_count()
    }

    pub fn trustline_count(&self) -> usize {
        self.state.read().graph.trustline_count()
    }

    /// Run `f` against the graph under a single read lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&TrustlineGraph) -> R) -> R {
        let state = self.state.read();
        f(&state.graph)
    }
}

impl NetworkState {
    fn observe(&mut self, timestamp: Option<Timestamp>) {
        let Some(timestamp) = timestamp else {
            return;
        };
        match self.last_event_at {
            Some(last) if timestamp < last => {
                tracing::warn!(
                    timestamp,
                    last_event_at = last,
                    "event older than the last applied one"
                );
            }
            _ => self.last_event_at = Some(timestamp),
        }
    }
}
