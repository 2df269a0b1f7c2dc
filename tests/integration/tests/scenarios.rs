//! Integration test: end-to-end route queries on known fixtures.

use tlr_core::{FeePayer, NetworkConfig};
use tlr_integration_tests::{community_with_debts, graph_with, ring, trustline, A, B, C, D, E};
use tlr_routing::{
    BalanceUpdate, CapacityRequest, CurrencyNetwork, PathFinder, TransferRequest,
    TriangulationRequest, TrustlineEvent,
};

// =========================================================================
// Ring A-B-C-D-E-A
// =========================================================================

#[test]
fn test_direct_neighbour_transfer() {
    let graph = ring();
    let request = TransferRequest::new(A, B, 10, FeePayer::Sender, 0);
    let path = PathFinder::new(&graph).find_transfer_path(&request).unwrap();
    assert_eq!(path.path, vec![A, B]);
    assert_eq!(path.fee, 0);
    assert_eq!(path.value, 10);
    assert_eq!(path.estimated_gas, None);
}

#[test]
fn test_one_mediator_costs_one() {
    let graph = ring();
    let request = TransferRequest::new(A, D, 10, FeePayer::Sender, 0);
    let path = PathFinder::new(&graph).find_transfer_path(&request).unwrap();
    assert_eq!(path.path, vec![A, E, D]);
    assert_eq!(path.fee, 1);
    assert_eq!(path.mediators(), &[E]);
}

#[test]
fn test_value_above_capacity_finds_nothing() {
    let graph = ring();
    let request = TransferRequest::new(A, E, 551, FeePayer::Sender, 0);
    let path = PathFinder::new(&graph).find_transfer_path(&request).unwrap();
    assert!(path.path.is_empty());
    assert_eq!(path.fee, 0);
}

#[test]
fn test_both_fee_payers_agree_on_single_mediator() {
    let graph = ring();
    let finder = PathFinder::new(&graph);
    for fee_payer in [FeePayer::Sender, FeePayer::Receiver] {
        let request = TransferRequest::new(A, C, 50, fee_payer, 0);
        let path = finder.find_transfer_path(&request).unwrap();
        assert_eq!(path.path, vec![A, B, C], "{fee_payer}");
        assert_eq!(path.fee, 1, "{fee_payer}");
        assert_eq!(path.fee_payer, fee_payer);
    }
}

// =========================================================================
// Triangulation
// =========================================================================

#[test]
fn test_triangulation_closes_debt_without_fees() {
    let graph = community_with_debts();
    let request = TriangulationRequest::new(A, B, 0);
    let path = PathFinder::new(&graph)
        .close_trustline_via_triangulation(&request)
        .unwrap();
    assert_eq!(path.path, vec![A, C, D, B, A]);
    assert_eq!(path.fee, 0);
    assert_eq!(path.value, 10_000);
    assert_eq!(path.fee_payer, FeePayer::Sender);
}

#[test]
fn test_triangulation_in_the_other_direction() {
    let graph = community_with_debts();
    // B is owed by A, so closing from B's side routes B -> A -> ... -> B.
    let request = TriangulationRequest::new(B, A, 0);
    let path = PathFinder::new(&graph)
        .close_trustline_via_triangulation(&request)
        .unwrap();
    assert_eq!(path.path.first(), Some(&B));
    assert_eq!(path.path.last(), Some(&B));
    assert_eq!(path.path[1], A);
    assert_eq!(path.value, 10_000);
    assert_eq!(path.fee_payer, FeePayer::Receiver);
}

// =========================================================================
// Maximum capacity
// =========================================================================

#[test]
fn test_max_capacity_single_trustline() {
    let graph = graph_with(NetworkConfig::new(100), &[(A, B, 50_000, 50_000)]);
    let request = CapacityRequest::new(A, B, 0);
    let result = PathFinder::new(&graph)
        .find_maximum_capacity_path(&request)
        .unwrap();
    assert_eq!(result, (50_000, vec![A, B]));
}

#[test]
fn test_max_capacity_is_sendable() {
    let graph = ring();
    let finder = PathFinder::new(&graph);
    let (capacity, path) = finder
        .find_maximum_capacity_path(&CapacityRequest::new(A, D, 0))
        .unwrap();
    assert!(capacity > 0);

    let request = TransferRequest::new(A, D, capacity, FeePayer::Receiver, 0);
    let transfer = finder.find_transfer_path(&request).unwrap();
    assert_eq!(transfer.path, path);
}

// =========================================================================
// Interest and the shared network
// =========================================================================

#[test]
fn test_interest_grows_capacity_over_time() {
    let network = CurrencyNetwork::new(NetworkConfig::new(100).with_default_interest_rate(1000)).unwrap();
    network.apply_trustline_update(&trustline(A, B, 1000, 1000)).unwrap();
    network
        .apply_event(&TrustlineEvent::BalanceUpdate(BalanceUpdate {
            from: A,
            to: B,
            balance: 1000,
            timestamp: Some(0),
        }))
        .unwrap();

    let year = tlr_core::SECONDS_PER_YEAR as i64;
    let now_balance = network.query_balance(A, B, 0).unwrap();
    let later_balance = network.query_balance(A, B, year).unwrap();
    assert_eq!(now_balance, 1000);
    assert!(later_balance > 1000);

    // A can send what B owes plus what B lets A owe.
    let fits = TransferRequest::new(A, B, 1000 + later_balance, FeePayer::Sender, year);
    assert_eq!(network.find_transfer_path(&fits, None).unwrap().path, vec![A, B]);
    let too_much = TransferRequest::new(A, B, 1001 + later_balance, FeePayer::Sender, year);
    assert!(network.find_transfer_path(&too_much, None).unwrap().is_empty());
}
