//! Graph fixtures shared by the integration tests.

use tlr_core::{Address, Amount, NetworkConfig};
use tlr_routing::{TrustlineGraph, TrustlineUpdate};

pub const A: Address = named(1);
pub const B: Address = named(2);
pub const C: Address = named(3);
pub const D: Address = named(4);
pub const E: Address = named(5);
pub const F: Address = named(6);
pub const G: Address = named(7);
pub const H: Address = named(8);

const fn named(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address::new(bytes)
}

pub fn trustline(creditor: Address, debtor: Address, given: Amount, received: Amount) -> TrustlineUpdate {
    TrustlineUpdate {
        creditor,
        debtor,
        creditline_given: given,
        creditline_received: received,
        interest_rate_given: None,
        interest_rate_received: None,
        is_frozen: false,
        timestamp: None,
    }
}

pub fn graph_with(config: NetworkConfig, lines: &[(Address, Address, Amount, Amount)]) -> TrustlineGraph {
    let mut graph = TrustlineGraph::new(config).expect("valid config");
    for &(creditor, debtor, given, received) in lines {
        graph
            .update_trustline(&trustline(creditor, debtor, given, received))
            .expect("valid trustline");
    }
    graph
}

/// Five accounts in a ring A-B-C-D-E-A, fee divisor 100. The creditor of
/// each edge grants the first limit and receives the second.
pub fn ring() -> TrustlineGraph {
    graph_with(
        NetworkConfig::new(100),
        &[
            (A, B, 100, 150),
            (B, C, 200, 250),
            (C, D, 300, 350),
            (D, E, 400, 450),
            (A, E, 500, 550),
        ],
    )
}

/// Eight accounts, 50000 limits both ways everywhere, fee divisor 100.
pub fn community() -> TrustlineGraph {
    let edges = [
        (A, B),
        (A, C),
        (B, D),
        (C, D),
        (C, E),
        (D, E),
        (D, F),
        (E, F),
        (F, G),
        (G, H),
        (E, H),
    ];
    let lines: Vec<_> = edges
        .iter()
        .map(|&(a, b)| (a, b, 50_000, 50_000))
        .collect();
    graph_with(NetworkConfig::new(100), &lines)
}

/// [`community`] with debts around A: A owes B, C owes A, B owes D and D
/// owes C, 10000 each.
pub fn community_with_debts() -> TrustlineGraph {
    let mut graph = community();
    for (a, b, balance) in [(A, B, -10_000), (A, C, 10_000), (B, D, -10_000), (C, D, 10_000)] {
        graph.update_balance(a, b, balance, None).expect("valid balance");
    }
    graph
}
