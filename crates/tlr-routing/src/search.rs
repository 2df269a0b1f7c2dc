use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use tlr_core::Address;

use crate::accumulator::CostAccumulator;
use crate::error::RoutingError;
use crate::graph::TrustlineGraph;

/// Cooperative time limit for a single query.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    expires: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            expires: None,
        }
    }

    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            expires: started.checked_add(timeout),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with [`RoutingError::Timeout`] once the deadline has passed.
    pub fn check(&self) -> Result<(), RoutingError> {
        if self.is_expired() {
            let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(elapsed_ms, "path search timed out");
            return Err(RoutingError::Timeout { elapsed_ms });
        }
        Ok(())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Lowest-cost path from any of `starting_nodes` to any of `target_nodes`.
///
/// A label-setting search: each node is settled the first time it is popped
/// from the queue, which is sound because every accumulator step is
/// monotone. The returned path runs from the start node the search left to
/// the target it reached. Ties are broken by account address, so results
/// are deterministic.
///
/// The walk direction is whatever the caller makes it: a backward search is
/// run by swapping the two node sets and reversing the result.
pub fn least_cost_path<A: CostAccumulator>(
    graph: &TrustlineGraph,
    starting_nodes: &[Address],
    target_nodes: &[Address],
    accumulator: &A,
    deadline: &Deadline,
) -> Result<(A::Cost, Vec<Address>), RoutingError> {
    for &node in starting_nodes.iter().chain(target_nodes) {
        if !graph.has_node(node) {
            return Err(RoutingError::UnknownNode(node));
        }
    }
    let targets: HashSet<Address> = target_nodes.iter().copied().collect();

    let mut best: HashMap<Address, A::Cost> = HashMap::new();
    let mut previous: HashMap<Address, Address> = HashMap::new();
    let mut settled: HashSet<Address> = HashSet::new();
    let mut queue = BinaryHeap::new();

    for &node in starting_nodes {
        let zero = accumulator.zero();
        best.insert(node, zero.clone());
        queue.push(Reverse((zero, node)));
    }

    while let Some(Reverse((cost, node))) = queue.pop() {
        deadline.check()?;

        if !settled.insert(node) {
            continue;
        }
        if targets.contains(&node) {
            return Ok((cost, reconstruct_path(&previous, node)));
        }

        for next in graph.friends_iter(node) {
            if settled.contains(&next) {
                continue;
            }
            let Some(line) = graph.trustline(node, next) else {
                continue;
            };
            let Some(next_cost) = accumulator.step(&cost, node, next, line)? else {
                continue;
            };
            if next_cost < cost {
                tracing::error!(
                    node = %node,
                    next = %next,
                    cost = ?cost,
                    next_cost = ?next_cost,
                    "cost accumulator produced a decreasing cost"
                );
                return Err(RoutingError::InvariantViolation(format!(
                    "cost decreased on hop {node} -> {next}"
                )));
            }
            let improves = best.get(&next).map_or(true, |known| next_cost < *known);
            if improves {
                best.insert(next, next_cost.clone());
                previous.insert(next, node);
                queue.push(Reverse((next_cost, next)));
            }
        }
    }

    Err(RoutingError::NoPathFound)
}

fn reconstruct_path(previous: &HashMap<Address, Address>, end: Address) -> Vec<Address> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = previous.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
