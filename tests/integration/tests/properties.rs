//! Integration test: properties that must hold for any graph state.

use proptest::prelude::*;

use tlr_core::{
    calculate_fee, calculate_fee_reverse, imbalance_generated, Address, Amount, FeePayer,
    NetworkConfig, PaymentPath,
};
use tlr_integration_tests::{community, community_with_debts, graph_with, trustline, A, B, C, D, E, F, G, H};
use tlr_routing::{
    cost_for_path, CostAccumulator, MaxCapacity, PathFinder, ReceiverPays, SearchLimits,
    SenderPays, TransferRequest, TriangulationRequest, TrustlineGraph,
};

const ALL: [Address; 8] = [A, B, C, D, E, F, G, H];

/// The community fixture with a spread of debts in both directions.
fn busy_community() -> TrustlineGraph {
    let mut graph = community_with_debts();
    for (a, b, balance) in [(E, F, 20_000), (F, G, -35_000), (G, H, 49_000), (C, E, -5)] {
        graph.update_balance(a, b, balance, None).unwrap();
    }
    graph
}

/// Amount crossing each hop of a sender-pays path, walking back from the
/// receiver: the last hop carries `value`, every mediator adds its fee.
fn sender_pays_amounts(graph: &TrustlineGraph, path: &PaymentPath) -> Vec<Amount> {
    let divisor = graph.config().capacity_imbalance_fee_divisor;
    let mut amounts = Vec::new();
    let mut forwarded = path.value;
    for (i, pair) in path.path.windows(2).rev().enumerate() {
        let balance = graph.get_balance_with_interest(pair[0], pair[1], 0).unwrap();
        if i > 0 {
            forwarded += calculate_fee_reverse(imbalance_generated(balance, forwarded), divisor).unwrap();
        }
        amounts.push(forwarded);
    }
    amounts.reverse();
    amounts
}

/// Amount crossing each hop of a receiver-pays path, walking from the
/// sender: the first hop carries `value`, every mediator keeps its fee.
fn receiver_pays_amounts(graph: &TrustlineGraph, path: &PaymentPath) -> Vec<Amount> {
    let divisor = graph.config().capacity_imbalance_fee_divisor;
    let mut amounts = Vec::new();
    let mut forwarded = path.value;
    let mut previous_balance = None;
    for pair in path.path.windows(2) {
        if let Some(balance) = previous_balance {
            forwarded -= calculate_fee(imbalance_generated(balance, forwarded), divisor);
        }
        amounts.push(forwarded);
        previous_balance = Some(graph.get_balance_with_interest(pair[0], pair[1], 0).unwrap());
    }
    amounts
}

// =========================================================================
// Balances
// =========================================================================

#[derive(Debug, Clone)]
enum Mutation {
    Balance(usize, usize, i64, i64),
    Limits(usize, usize, u32, u32),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0..4usize, 0..4usize, any::<i64>(), 0..1_000_000i64)
            .prop_map(|(a, b, balance, at)| Mutation::Balance(a, b, balance, at)),
        (0..4usize, 0..4usize, any::<u32>(), any::<u32>())
            .prop_map(|(a, b, given, received)| Mutation::Limits(a, b, given, received)),
    ]
}

proptest! {
    #[test]
    fn prop_balance_symmetry(mutations in proptest::collection::vec(mutation(), 1..40)) {
        let config = NetworkConfig::new(100).with_default_interest_rate(250);
        let mut graph = TrustlineGraph::new(config).unwrap();
        for m in mutations {
            // Invalid input (self-trustlines) is rejected and changes nothing.
            let _ = match m {
                Mutation::Balance(a, b, balance, at) => {
                    graph.update_balance(ALL[a], ALL[b], balance.into(), Some(at))
                }
                Mutation::Limits(a, b, given, received) => graph.update_trustline(
                    &trustline(ALL[a], ALL[b], given.into(), received.into()),
                ),
            };
            for &x in &ALL[..4] {
                for &y in &ALL[..4] {
                    let xy = graph.get_balance_with_interest(x, y, 2_000_000).unwrap();
                    let yx = graph.get_balance_with_interest(y, x, 2_000_000).unwrap();
                    prop_assert_eq!(xy, -yx);
                }
            }
        }
    }

    #[test]
    fn prop_fee_zero_iff_no_imbalance(imbalance in 0i128..1_000_000_000_000, divisor in 2u64..10_000) {
        let fee = calculate_fee(imbalance, divisor);
        prop_assert_eq!(fee == 0, imbalance == 0);
        let reverse = calculate_fee_reverse(imbalance, divisor).unwrap();
        prop_assert_eq!(reverse == 0, imbalance == 0);
    }
}

// =========================================================================
// Accumulators
// =========================================================================

/// Walk every two-hop walk of `graph` with `acc` and check no step lowers
/// the cost.
fn assert_monotone<A: CostAccumulator>(graph: &TrustlineGraph, acc: &A) {
    for &a in &ALL {
        for b in graph.get_friends(a) {
            let first_line = graph.trustline(a, b).unwrap();
            let Some(first) = acc.step(&acc.zero(), a, b, first_line).unwrap() else {
                continue;
            };
            assert!(first >= acc.zero());
            for c in graph.get_friends(b) {
                if c == a {
                    continue;
                }
                let line = graph.trustline(b, c).unwrap();
                if let Some(second) = acc.step(&first, b, c, line).unwrap() {
                    assert!(second >= first, "{a} -> {b} -> {c}: {second:?} < {first:?}");
                }
            }
        }
    }
}

#[test]
fn test_all_accumulators_are_monotone() {
    let graph = busy_community();
    for value in [1, 99, 5_000, 40_000] {
        assert_monotone(&graph, &SenderPays::new(value, 100, 0, SearchLimits::default()));
        assert_monotone(&graph, &ReceiverPays::new(value, 100, 0, SearchLimits::default()));
    }
    assert_monotone(&graph, &MaxCapacity::new(100, 0, SearchLimits::default()));
}

// =========================================================================
// Paths
// =========================================================================

#[test]
fn test_sender_pays_paths_respect_capacity() {
    let graph = busy_community();
    let finder = PathFinder::new(&graph);
    for &source in &ALL {
        for &target in &ALL {
            if source == target {
                continue;
            }
            for value in [1, 1_000, 30_000, 60_000] {
                let request = TransferRequest::new(source, target, value, FeePayer::Sender, 0);
                let path = finder.find_transfer_path(&request).unwrap();
                if path.is_empty() {
                    continue;
                }
                let amounts = sender_pays_amounts(&graph, &path);
                assert_eq!(amounts.last(), Some(&value));
                assert_eq!(amounts[0] - value, path.fee, "{source} -> {target}");
                for (pair, amount) in path.path.windows(2).zip(amounts) {
                    let summary = graph
                        .get_account_summary(pair[0], Some(pair[1]), 0)
                        .unwrap();
                    assert!(
                        amount <= summary.creditline_left_received().unwrap(),
                        "{} -> {} carries {amount}",
                        pair[0],
                        pair[1]
                    );
                }
            }
        }
    }
}

#[test]
fn test_receiver_pays_paths_respect_capacity() {
    let graph = busy_community();
    let finder = PathFinder::new(&graph);
    for &source in &ALL {
        for &target in &ALL {
            if source == target {
                continue;
            }
            for value in [1, 1_000, 30_000, 60_000] {
                let request = TransferRequest::new(source, target, value, FeePayer::Receiver, 0);
                let path = finder.find_transfer_path(&request).unwrap();
                if path.is_empty() {
                    continue;
                }
                let amounts = receiver_pays_amounts(&graph, &path);
                assert_eq!(amounts.first(), Some(&value));
                assert_eq!(value - amounts[amounts.len() - 1], path.fee, "{source} -> {target}");
                for (pair, amount) in path.path.windows(2).zip(amounts) {
                    assert!(amount > 0);
                    let summary = graph
                        .get_account_summary(pair[0], Some(pair[1]), 0)
                        .unwrap();
                    assert!(
                        amount <= summary.creditline_left_received().unwrap(),
                        "{} -> {} carries {amount}",
                        pair[0],
                        pair[1]
                    );
                }
            }
        }
    }
}

#[test]
fn test_direct_transfers_are_free() {
    let graph = busy_community();
    let finder = PathFinder::new(&graph);
    for &source in &ALL {
        for target in graph.get_friends(source) {
            for fee_payer in [FeePayer::Sender, FeePayer::Receiver] {
                let request = TransferRequest::new(source, target, 10, fee_payer, 0).with_max_hops(1);
                let path = finder.find_transfer_path(&request).unwrap();
                assert_eq!(path.path, vec![source, target]);
                assert_eq!(path.fee, 0);
            }
        }
    }
}

#[test]
fn test_triangulation_fee_replays_exactly() {
    let graph = busy_community();
    let finder = PathFinder::new(&graph);
    let mut found = 0;
    for &source in &ALL {
        for target in graph.get_friends(source) {
            let path = finder
                .close_trustline_via_triangulation(&TriangulationRequest::new(source, target, 0))
                .unwrap();
            if path.is_empty() {
                continue;
            }
            found += 1;
            assert_eq!(path.path.first(), Some(&source));
            assert_eq!(path.path.last(), Some(&source));
            let replayed = match path.fee_payer {
                FeePayer::Sender => {
                    let acc = SenderPays::new(path.value, 100, 0, SearchLimits::default());
                    cost_for_path(&graph, &acc, &path.path).unwrap().fees
                }
                FeePayer::Receiver => {
                    let acc = ReceiverPays::new(path.value, 100, 0, SearchLimits::default());
                    cost_for_path(&graph, &acc, &path.path).unwrap().fees
                }
            };
            assert_eq!(replayed, path.fee, "{source} / {target}");
        }
    }
    assert!(found > 0);
}

#[test]
fn test_no_path_between_separate_components() {
    let graph = graph_with(NetworkConfig::new(100), &[(A, B, 100, 100), (C, D, 100, 100)]);
    let request = TransferRequest::new(A, D, 10, FeePayer::Receiver, 0);
    let path = PathFinder::new(&graph).find_transfer_path(&request).unwrap();
    assert!(path.is_empty());
    assert_eq!(path.fee, 0);
}

#[test]
fn test_unused_accounts_have_no_debt() {
    let graph = community();
    for &a in &ALL {
        let summary = graph.get_account_summary(a, None, 0).unwrap();
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.frozen_balance, 0);
    }
}
