//! Cost accumulators driving the least-cost path search.
//!
//! An accumulator turns the cost of reaching one account plus the trustline
//! to a neighbour into the cost of reaching that neighbour, or rejects the
//! hop. Every accumulator guarantees `step(cost) >= cost`, which is what
//! lets the search settle a node the first time it is popped.

use std::cmp::{Ordering, Reverse};
use std::fmt::Debug;

use tlr_core::{
    calculate_fee, calculate_fee_reverse, imbalance_generated, Address, Amount, CoreError,
    Timestamp,
};

use crate::error::RoutingError;
use crate::graph::TrustlineGraph;
use crate::trustline::Trustline;

/// Which way the search walks relative to the flow of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// From the sender towards the receiver.
    Forward,
    /// From the receiver back towards the sender.
    Backward,
}

/// Constraints shared by all accumulators. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_hops: Option<usize>,
    pub max_fees: Option<Amount>,
    /// Account that may not appear on any hop.
    pub ignore: Option<Address>,
}

impl SearchLimits {
    pub fn new(max_hops: Option<usize>, max_fees: Option<Amount>) -> Self {
        Self {
            max_hops,
            max_fees,
            ignore: None,
        }
    }

    pub fn ignoring(mut self, account: Address) -> Self {
        self.ignore = Some(account);
        self
    }

    /// Limits used to re-price a path found under tighter constraints: no
    /// ignored account and no hop budget, same fee budget.
    pub fn relaxed(self) -> Self {
        Self {
            max_hops: None,
            max_fees: self.max_fees,
            ignore: None,
        }
    }

    fn touches_ignored(&self, node: Address, next: Address) -> bool {
        self.ignore.is_some_and(|ignored| ignored == node || ignored == next)
    }

    fn exceeds_hops(&self, hops: usize) -> bool {
        self.max_hops.is_some_and(|max| hops > max)
    }

    fn exceeds_fees(&self, fees: Amount) -> bool {
        self.max_fees.is_some_and(|max| fees > max)
    }
}

/// Strategy plugged into [`crate::search::least_cost_path`].
pub trait CostAccumulator {
    type Cost: Ord + Clone + Debug;

    /// Which way the search has to walk for this strategy.
    fn direction(&self) -> SearchDirection;

    /// Cost of the empty path; no reachable cost is lower.
    fn zero(&self) -> Self::Cost;

    /// Cost of reaching `next` from `node` over `line`, or `None` when the
    /// hop is not usable. `node` is the account the search currently stands
    /// on; for backward searches money flows from `next` to `node`.
    fn step(
        &self,
        cost: &Self::Cost,
        node: Address,
        next: Address,
        line: &Trustline,
    ) -> Result<Option<Self::Cost>, CoreError>;

    /// Same accumulator with [`SearchLimits::relaxed`] limits.
    fn relaxed(&self) -> Self
    where
        Self: Sized;
}

fn add(a: Amount, b: Amount, op: &'static str) -> Result<Amount, CoreError> {
    a.checked_add(b).ok_or(CoreError::Overflow { op })
}

/// Cost when the sender pays: `(fees, hops)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SenderPaysCost {
    pub fees: Amount,
    pub hops: usize,
}

/// The sender pays all fees and the receiver gets exactly `value`.
///
/// Searches backward from the receiver: the amount each mediator has to
/// forward is known once the hops after it are priced.
#[derive(Debug, Clone)]
pub struct SenderPays {
    value: Amount,
    fee_divisor: u64,
    now: Timestamp,
    limits: SearchLimits,
}

impl SenderPays {
    pub fn new(value: Amount, fee_divisor: u64, now: Timestamp, limits: SearchLimits) -> Self {
        Self {
            value,
            fee_divisor,
            now,
            limits,
        }
    }
}

impl CostAccumulator for SenderPays {
    type Cost = SenderPaysCost;

    fn direction(&self) -> SearchDirection {
        SearchDirection::Backward
    }

    fn zero(&self) -> SenderPaysCost {
        SenderPaysCost { fees: 0, hops: 0 }
    }

    fn step(
        &self,
        cost: &SenderPaysCost,
        node: Address,
        next: Address,
        line: &Trustline,
    ) -> Result<Option<SenderPaysCost>, CoreError> {
        if line.is_frozen() || self.limits.touches_ignored(node, next) {
            return Ok(None);
        }
        let hops = cost.hops + 1;
        if self.limits.exceeds_hops(hops) {
            return Ok(None);
        }

        // Money flows next -> node.
        let view = line.view(next);
        let balance = view.balance_with_interest(self.now)?;
        let forwarded = add(self.value, cost.fees, "forwarded value")?;
        // The receiver is not a mediator and charges nothing.
        let fee = if cost.hops == 0 {
            0
        } else {
            calculate_fee_reverse(imbalance_generated(balance, forwarded), self.fee_divisor)?
        };
        let fees = add(cost.fees, fee, "fees")?;
        if self.limits.exceeds_fees(fees) {
            return Ok(None);
        }

        let sent = add(forwarded, fee, "sent value")?;
        let capacity = add(balance, view.creditline_received(), "capacity")?;
        if sent > capacity {
            return Ok(None);
        }
        Ok(Some(SenderPaysCost { fees, hops }))
    }

    fn relaxed(&self) -> Self {
        Self {
            limits: self.limits.relaxed(),
            ..self.clone()
        }
    }
}

/// Cost when the receiver pays: `(fees, hops, pending_fee)`.
///
/// `pending_fee` is what the last account reached would charge if it
/// forwarded the payment; it only becomes part of `fees` once another hop
/// is taken, since the receiver is not a mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReceiverPaysCost {
    pub fees: Amount,
    pub hops: usize,
    pub pending_fee: Amount,
}

/// The sender sends exactly `value`; fees are deducted on the way and the
/// receiver gets what is left.
#[derive(Debug, Clone)]
pub struct ReceiverPays {
    value: Amount,
    fee_divisor: u64,
    now: Timestamp,
    limits: SearchLimits,
}

impl ReceiverPays {
    pub fn new(value: Amount, fee_divisor: u64, now: Timestamp, limits: SearchLimits) -> Self {
        Self {
            value,
            fee_divisor,
            now,
            limits,
        }
    }
}

impl CostAccumulator for ReceiverPays {
    type Cost = ReceiverPaysCost;

    fn direction(&self) -> SearchDirection {
        SearchDirection::Forward
    }

    fn zero(&self) -> ReceiverPaysCost {
        ReceiverPaysCost {
            fees: 0,
            hops: 0,
            pending_fee: 0,
        }
    }

    fn step(
        &self,
        cost: &ReceiverPaysCost,
        node: Address,
        next: Address,
        line: &Trustline,
    ) -> Result<Option<ReceiverPaysCost>, CoreError> {
        if line.is_frozen() || self.limits.touches_ignored(node, next) {
            return Ok(None);
        }
        let hops = cost.hops + 1;
        if self.limits.exceeds_hops(hops) {
            return Ok(None);
        }
        let fees = add(cost.fees, cost.pending_fee, "fees")?;
        if self.limits.exceeds_fees(fees) {
            return Ok(None);
        }
        let flowing = self.value - fees;
        if flowing <= 0 {
            return Ok(None);
        }

        // Money flows node -> next.
        let view = line.view(node);
        let balance = view.balance_with_interest(self.now)?;
        let capacity = add(balance, view.creditline_received(), "capacity")?;
        if flowing > capacity {
            return Ok(None);
        }
        let pending_fee = calculate_fee(imbalance_generated(balance, flowing), self.fee_divisor);
        Ok(Some(ReceiverPaysCost {
            fees,
            hops,
            pending_fee,
        }))
    }

    fn relaxed(&self) -> Self {
        Self {
            limits: self.limits.relaxed(),
            ..self.clone()
        }
    }
}

/// Cost of the max-capacity search: larger capacity is cheaper.
///
/// `capacity` is `None` on the empty path (unbounded). Ordered by
/// `(-capacity, hops, pending_fee)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxCapacityCost {
    pub capacity: Option<Amount>,
    pub hops: usize,
    pub pending_fee: Amount,
}

impl MaxCapacityCost {
    /// Capacity of the path; zero for the empty path.
    pub fn value(&self) -> Amount {
        self.capacity.unwrap_or(0)
    }

    fn order_key(&self) -> (bool, Reverse<Amount>, usize, Amount) {
        (
            self.capacity.is_some(),
            Reverse(self.capacity.unwrap_or(0)),
            self.hops,
            self.pending_fee,
        )
    }
}

impl Ord for MaxCapacityCost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for MaxCapacityCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the path that can carry the most value, receiver paying fees.
#[derive(Debug, Clone)]
pub struct MaxCapacity {
    fee_divisor: u64,
    now: Timestamp,
    limits: SearchLimits,
}

impl MaxCapacity {
    pub fn new(fee_divisor: u64, now: Timestamp, limits: SearchLimits) -> Self {
        Self {
            fee_divisor,
            now,
            limits,
        }
    }
}

impl CostAccumulator for MaxCapacity {
    type Cost = MaxCapacityCost;

    fn direction(&self) -> SearchDirection {
        SearchDirection::Forward
    }

    fn zero(&self) -> MaxCapacityCost {
        MaxCapacityCost {
            capacity: None,
            hops: 0,
            pending_fee: 0,
        }
    }

    fn step(
        &self,
        cost: &MaxCapacityCost,
        node: Address,
        next: Address,
        line: &Trustline,
    ) -> Result<Option<MaxCapacityCost>, CoreError> {
        if line.is_frozen() || self.limits.touches_ignored(node, next) {
            return Ok(None);
        }
        let hops = cost.hops + 1;
        if self.limits.exceeds_hops(hops) {
            return Ok(None);
        }

        let view = line.view(node);
        let balance = view.balance_with_interest(self.now)?;
        let edge_capacity = add(balance, view.creditline_received(), "capacity")?;
        let capacity = match cost.capacity {
            None => edge_capacity,
            Some(upstream) => (upstream - cost.pending_fee).min(edge_capacity),
        };
        if capacity <= 0 {
            return Ok(None);
        }
        let pending_fee = calculate_fee(imbalance_generated(balance, capacity), self.fee_divisor);
        Ok(Some(MaxCapacityCost {
            capacity: Some(capacity),
            hops,
            pending_fee,
        }))
    }

    fn relaxed(&self) -> Self {
        Self {
            limits: self.limits.relaxed(),
            ..self.clone()
        }
    }
}

/// Price a concrete path, given in the order money flows.
///
/// Walks the path in the accumulator's search direction. Fails with
/// [`RoutingError::NoPathFound`] when a hop has no trustline or is rejected.
pub fn cost_for_path<A: CostAccumulator>(
    graph: &TrustlineGraph,
    accumulator: &A,
    path: &[Address],
) -> Result<A::Cost, RoutingError> {
    let ordered: Vec<Address> = match accumulator.direction() {
        SearchDirection::Forward => path.to_vec(),
        SearchDirection::Backward => path.iter().rev().copied().collect(),
    };

    let mut cost = accumulator.zero();
    for pair in ordered.windows(2) {
        let (node, next) = (pair[0], pair[1]);
        let line = graph
            .trustline(node, next)
            .ok_or(RoutingError::NoPathFound)?;
        cost = accumulator
            .step(&cost, node, next, line)?
            .ok_or(RoutingError::NoPathFound)?;
    }
    Ok(cost)
}
