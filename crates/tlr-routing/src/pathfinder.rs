//! Route queries: transfers, maximum capacity and debt-closing triangles.

use tlr_core::{Address, Amount, CoreError, FeePayer, PaymentPath, Timestamp};

use crate::accumulator::{
    cost_for_path, CostAccumulator, MaxCapacity, ReceiverPays, SearchDirection, SearchLimits,
    SenderPays,
};
use crate::error::RoutingError;
use crate::graph::TrustlineGraph;
use crate::search::{least_cost_path, Deadline};

/// A payment of `value` from `source` to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: Address,
    pub target: Address,
    pub value: Amount,
    pub max_hops: Option<usize>,
    pub max_fees: Option<Amount>,
    pub fee_payer: FeePayer,
    pub now: Timestamp,
}

impl TransferRequest {
    pub fn new(
        source: Address,
        target: Address,
        value: Amount,
        fee_payer: FeePayer,
        now: Timestamp,
    ) -> Self {
        Self {
            source,
            target,
            value,
            max_hops: None,
            max_fees: None,
            fee_payer,
            now,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn with_max_fees(mut self, max_fees: Amount) -> Self {
        self.max_fees = Some(max_fees);
        self
    }
}

/// How much can `source` send to `target` at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityRequest {
    pub source: Address,
    pub target: Address,
    pub max_hops: Option<usize>,
    pub now: Timestamp,
}

impl CapacityRequest {
    pub fn new(source: Address, target: Address, now: Timestamp) -> Self {
        Self {
            source,
            target,
            max_hops: None,
            now,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }
}

/// Settle the balance between `source` and `target` through a loop that
/// starts and ends at `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangulationRequest {
    pub source: Address,
    pub target: Address,
    pub max_hops: Option<usize>,
    pub max_fees: Option<Amount>,
    pub now: Timestamp,
}

impl TriangulationRequest {
    pub fn new(source: Address, target: Address, now: Timestamp) -> Self {
        Self {
            source,
            target,
            max_hops: None,
            max_fees: None,
            now,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn with_max_fees(mut self, max_fees: Amount) -> Self {
        self.max_fees = Some(max_fees);
        self
    }
}

/// Answers route queries against one consistent state of a graph.
///
/// "No route" is a regular answer and comes back as an empty path; only
/// unknown accounts, bad input, timeouts and internal faults are errors.
pub struct PathFinder<'a> {
    graph: &'a TrustlineGraph,
    deadline: Deadline,
}

impl<'a> PathFinder<'a> {
    pub fn new(graph: &'a TrustlineGraph) -> Self {
        Self {
            graph,
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    fn fee_divisor(&self) -> u64 {
        self.graph.config().capacity_imbalance_fee_divisor
    }

    pub fn find_transfer_path(
        &self,
        request: &TransferRequest,
    ) -> Result<PaymentPath, RoutingError> {
        let TransferRequest {
            source,
            target,
            value,
            fee_payer,
            now,
            ..
        } = *request;
        if value < 0 {
            return Err(CoreError::NegativeAmount {
                field: "value",
                value,
            }
            .into());
        }
        self.require_known(&[source, target])?;
        if value == 0 || source == target {
            return Ok(PaymentPath::not_found(value, fee_payer));
        }

        let limits = SearchLimits::new(request.max_hops, request.max_fees);
        let found = match fee_payer {
            FeePayer::Sender => {
                let acc = SenderPays::new(value, self.fee_divisor(), now, limits);
                self.search(&acc, &[source], &[target])
                    .map(|(cost, path)| (cost.fees, path))
            }
            FeePayer::Receiver => {
                let acc = ReceiverPays::new(value, self.fee_divisor(), now, limits);
                self.search(&acc, &[source], &[target])
                    .map(|(cost, path)| (cost.fees, path))
            }
        };

        match found {
            Ok((fee, path)) => {
                tracing::debug!(
                    source = %source,
                    target = %target,
                    value = %value,
                    fee = %fee,
                    hops = path.len().saturating_sub(1),
                    fee_payer = %fee_payer,
                    "transfer path found"
                );
                Ok(PaymentPath::new(fee, path, value, fee_payer))
            }
            Err(RoutingError::NoPathFound) => {
                tracing::debug!(source = %source, target = %target, value = %value, "no transfer path");
                Ok(PaymentPath::not_found(value, fee_payer))
            }
            Err(err) => Err(err),
        }
    }

    /// Largest value `source` can send to `target` and the path carrying it.
    /// `(0, [])` when nothing can be sent.
    pub fn find_maximum_capacity_path(
        &self,
        request: &CapacityRequest,
    ) -> Result<(Amount, Vec<Address>), RoutingError> {
        let CapacityRequest {
            source,
            target,
            max_hops,
            now,
        } = *request;
        self.require_known(&[source, target])?;
        if source == target {
            return Ok((0, Vec::new()));
        }

        let acc = MaxCapacity::new(self.fee_divisor(), now, SearchLimits::new(max_hops, None));
        match self.search(&acc, &[source], &[target]) {
            Ok((cost, path)) => {
                tracing::debug!(
                    source = %source,
                    target = %target,
                    capacity = %cost.value(),
                    "maximum capacity path found"
                );
                Ok((cost.value(), path))
            }
            Err(RoutingError::NoPathFound) => Ok((0, Vec::new())),
            Err(err) => Err(err),
        }
    }

    /// Route the debt between `source` and `target` around a loop through
    /// another of `source`'s friends.
    ///
    /// When `source` owes `target`, the loop is
    /// `source -> friend -> ... -> target -> source` and `source` pays the
    /// fees. When `target` owes `source`, the loop runs
    /// `source -> target -> ... -> friend -> source` and the fees come out
    /// of what returns to `source`.
    pub fn close_trustline_via_triangulation(
        &self,
        request: &TriangulationRequest,
    ) -> Result<PaymentPath, RoutingError> {
        let TriangulationRequest {
            source,
            target,
            max_hops,
            max_fees,
            now,
        } = *request;
        self.require_known(&[source, target])?;

        let balance = self.graph.get_balance_with_interest(source, target, now)?;
        let fee_payer = if balance < 0 {
            FeePayer::Sender
        } else {
            FeePayer::Receiver
        };
        let value = balance.checked_abs().ok_or(CoreError::Overflow {
            op: "triangulation value",
        })?;
        if balance == 0 || source == target {
            return Ok(PaymentPath::not_found(value, fee_payer));
        }

        // The two edges touching `source` are not part of the sub-search.
        let sub_hops = match max_hops {
            Some(hops) if hops < 2 => return Ok(PaymentPath::not_found(value, fee_payer)),
            Some(hops) => Some(hops - 2),
            None => None,
        };
        let friends: Vec<Address> = self
            .graph
            .get_friends(source)
            .into_iter()
            .filter(|friend| *friend != target)
            .collect();
        if friends.is_empty() {
            return Ok(PaymentPath::not_found(value, fee_payer));
        }

        let limits = SearchLimits::new(sub_hops, max_fees).ignoring(source);
        let divisor = self.fee_divisor();
        let priced = if balance < 0 {
            let acc = SenderPays::new(value, divisor, now, limits);
            self.search(&acc, &friends, &[target])
                .and_then(|(_, inner)| {
                    let full = close_loop(source, inner);
                    let cost = cost_for_path(self.graph, &acc.relaxed(), &full)?;
                    Ok((cost.fees, full))
                })
        } else {
            let acc = ReceiverPays::new(value, divisor, now, limits);
            self.search(&acc, &[target], &friends)
                .and_then(|(_, inner)| {
                    let full = close_loop(source, inner);
                    let cost = cost_for_path(self.graph, &acc.relaxed(), &full)?;
                    Ok((cost.fees, full))
                })
        };

        match priced {
            Ok((fee, path)) => {
                tracing::debug!(
                    source = %source,
                    target = %target,
                    value = %value,
                    fee = %fee,
                    fee_payer = %fee_payer,
                    "triangulation found"
                );
                Ok(PaymentPath::new(fee, path, value, fee_payer))
            }
            Err(RoutingError::NoPathFound) => Ok(PaymentPath::not_found(value, fee_payer)),
            Err(err) => Err(err),
        }
    }

    /// Run `accumulator` for money flowing from one of `senders` to one of
    /// `receivers`. The returned path is always in the order money flows.
    fn search<A: CostAccumulator>(
        &self,
        accumulator: &A,
        senders: &[Address],
        receivers: &[Address],
    ) -> Result<(A::Cost, Vec<Address>), RoutingError> {
        match accumulator.direction() {
            SearchDirection::Forward => {
                least_cost_path(self.graph, senders, receivers, accumulator, &self.deadline)
            }
            SearchDirection::Backward => {
                let (cost, mut path) =
                    least_cost_path(self.graph, receivers, senders, accumulator, &self.deadline)?;
                path.reverse();
                Ok((cost, path))
            }
        }
    }

    fn require_known(&self, accounts: &[Address]) -> Result<(), RoutingError> {
        match accounts.iter().find(|account| !self.graph.has_node(**account)) {
            Some(&unknown) => Err(RoutingError::UnknownNode(unknown)),
            None => Ok(()),
        }
    }
}

fn close_loop(source: Address, inner: Vec<Address>) -> Vec<Address> {
    let mut full = Vec::with_capacity(inner.len() + 2);
    full.push(source);
    full.extend(inner);
    full.push(source);
    full
}
