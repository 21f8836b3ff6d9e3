//! Scenario tests driving the routers through `MockWorld`
//!
//! Every scenario wires routers into an in-memory world, brings contacts
//! up and down, runs ticks, and completes the resulting transfers.

use std::sync::Arc;

use ferry_core::{
    Coord, HostId, Message, MessageId, MockWorld, PredictabilitySource, RoutingError,
    RoutingStrategy, TickOutcome, TransferScheme, same_routing_context,
};
use ferry_routing::{
    EncounterConfig, EncounterMatrix, EncounterUtilityRouter, GeometricConfig,
    GeometricReplicationRouter, PredictiveProphetRouter, ProphetConfig, RouterSettings,
};

// ============================================================================
// Helpers
// ============================================================================

fn make_id(n: u32) -> HostId {
    HostId(n)
}

fn msg_id(id: &str) -> MessageId {
    MessageId::new(id)
}

/// Hosts on a line, 100 apart, all with radio range 10
fn line_world(count: u32) -> MockWorld {
    let mut world = MockWorld::new();
    for i in 0..count {
        world.add_host(make_id(i), Coord::new(f64::from(i) * 100.0, 0.0), 10.0);
    }
    world
}

fn prophet(host: u32, nrof_copies: u32, binary_mode: bool) -> Arc<PredictiveProphetRouter> {
    let config = ProphetConfig {
        nrof_copies,
        binary_mode,
        ..Default::default()
    };
    Arc::new(PredictiveProphetRouter::new(make_id(host), config, RouterSettings::default()))
}

fn geometric(host: u32, nrof_copies: u32) -> Arc<GeometricReplicationRouter> {
    Arc::new(GeometricReplicationRouter::new(
        make_id(host),
        GeometricConfig { nrof_copies },
        RouterSettings::default(),
    ))
}

fn encounter(host: u32, matrix: &Arc<EncounterMatrix>) -> Arc<EncounterUtilityRouter> {
    Arc::new(EncounterUtilityRouter::new(
        make_id(host),
        EncounterConfig::default(),
        RouterSettings::default(),
        Arc::clone(matrix),
    ))
}

/// Let `a` meet `b` briefly so their tables learn about each other
fn brief_contact(world: &mut MockWorld, a: u32, b: u32) {
    world.connect(make_id(a), make_id(b)).unwrap();
    world.disconnect(make_id(a), make_id(b));
}

// ============================================================================
// Predictive spraying
// ============================================================================

/// n0 holds a message for n2; n1 has met n2 before
fn prophet_relay(nrof_copies: u32, binary_mode: bool) -> MockWorld {
    let mut world = line_world(3);
    for i in 0..3 {
        world.register(prophet(i, nrof_copies, binary_mode));
    }
    brief_contact(&mut world, 1, 2);

    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(2), 100))
        .unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();
    world
}

#[test]
fn test_first_contact_predictability() {
    let mut world = line_world(2);
    let a = prophet(0, 6, true);
    world.register(a.clone());
    world.register(prophet(1, 6, true));

    world.connect(make_id(0), make_id(1)).unwrap();
    assert_eq!(a.predictability_for(make_id(1), 0.0), 0.75);
}

#[test]
fn test_binary_spray_splits_six_into_three_and_three() {
    let mut world = prophet_relay(6, true);

    let outcome = world.tick(make_id(0)).unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Started {
            message: msg_id("M1"),
            peer: make_id(1),
            scheme: None,
        }
    );

    let done = world.complete_transfers().unwrap();
    assert_eq!(done.len(), 1);

    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    let receiver = world.message(make_id(1), &msg_id("M1")).unwrap();
    assert_eq!(sender.prophet_replicas().unwrap(), 3);
    assert_eq!(receiver.prophet_replicas().unwrap(), 3);
}

#[test]
fn test_single_spray_splits_five_into_four_and_one() {
    let mut world = prophet_relay(5, false);

    assert!(world.tick(make_id(0)).unwrap().started_transfer());
    world.complete_transfers().unwrap();

    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    let receiver = world.message(make_id(1), &msg_id("M1")).unwrap();
    assert_eq!(sender.prophet_replicas().unwrap(), 4);
    assert_eq!(receiver.prophet_replicas().unwrap(), 1);
}

#[test]
fn test_single_replica_is_not_sprayed() {
    let mut world = prophet_relay(1, true);
    assert_eq!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Exhausted { attempted: 0 }
    );
}

#[test]
fn test_peer_without_better_predictability_gets_nothing() {
    let mut world = line_world(3);
    for i in 0..3 {
        world.register(prophet(i, 6, true));
    }
    // n1 never met n2
    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(2), 100))
        .unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();

    assert_eq!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Exhausted { attempted: 0 }
    );
}

#[test]
fn test_best_peer_is_tried_first() {
    let mut world = line_world(4);
    for i in 0..4 {
        world.register(prophet(i, 6, true));
    }
    // n1 met n3 once, n2 met n3 twice
    brief_contact(&mut world, 1, 3);
    brief_contact(&mut world, 2, 3);
    brief_contact(&mut world, 2, 3);

    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(3), 100))
        .unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();
    world.connect(make_id(0), make_id(2)).unwrap();

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(outcome, TickOutcome::Started { peer, .. } if peer == make_id(2)));
}

#[test]
fn test_refused_best_peer_falls_back_to_next() {
    let mut world = line_world(4);
    for i in 0..4 {
        world.register(prophet(i, 6, true));
    }
    brief_contact(&mut world, 1, 3);
    brief_contact(&mut world, 2, 3);
    brief_contact(&mut world, 2, 3);

    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(3), 100))
        .unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();
    world.connect(make_id(0), make_id(2)).unwrap();
    world.set_accepting(make_id(2), false);

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(outcome, TickOutcome::Started { peer, .. } if peer == make_id(1)));
}

#[test]
fn test_equal_predictability_follows_queue_order() {
    let mut world = prophet_relay(6, true);
    // Second message, same destination, queued after M1
    world
        .create_message(make_id(0), Message::new("M0", make_id(0), make_id(2), 100))
        .unwrap();

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(outcome, TickOutcome::Started { ref message, .. } if *message == msg_id("M1")));
}

#[test]
fn test_transitive_update_through_router_contact() {
    let mut world = line_world(3);
    let a = prophet(0, 6, true);
    world.register(a.clone());
    world.register(prophet(1, 6, true));
    world.register(prophet(2, 6, true));

    brief_contact(&mut world, 1, 2);
    world.connect(make_id(0), make_id(1)).unwrap();

    // 0.75 * 0.75 * 0.25
    assert!((a.predictability_for(make_id(2), 0.0) - 0.140625).abs() < 1e-12);
    assert!(a.predictabilities(0.0).iter().all(|(h, _)| *h != make_id(0)));
}

#[test]
fn test_predictability_ages_between_contacts() {
    let mut world = line_world(2);
    let a = prophet(0, 6, true);
    world.register(a.clone());
    world.register(prophet(1, 6, true));

    brief_contact(&mut world, 0, 1);
    world.advance(300.0);

    // Ten 30 s units
    let expected = 0.75 * 0.98f64.powi(10);
    assert!((a.predictability_for(make_id(1), world.now()) - expected).abs() < 1e-9);
}

#[test]
fn test_prophet_diagnostics() {
    let mut world = line_world(2);
    world.register(prophet(0, 6, true));
    world.register(prophet(1, 6, true));
    world.connect(make_id(0), make_id(1)).unwrap();

    let info = world.diagnostics(make_id(0)).unwrap();
    let table = info.child_starting_with("1 delivery prediction").unwrap();
    assert_eq!(table.children()[0].text(), "n1 : 0.750000");
}

// ============================================================================
// Geometric replication
// ============================================================================

/// Destination n2 at the origin, range 10; sender n0 far east
fn geometric_world(peer: Coord, nrof_copies: u32) -> MockWorld {
    let mut world = MockWorld::new();
    world.add_host(make_id(0), Coord::new(50.0, 0.0), 10.0);
    world.add_host(make_id(1), peer, 10.0);
    world.add_host(make_id(2), Coord::new(0.0, 0.0), 10.0);
    world.add_host(make_id(3), Coord::new(0.0, 40.0), 10.0);
    for i in 0..4 {
        world.register(geometric(i, nrof_copies));
    }
    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(2), 100))
        .unwrap();
    world
}

#[test]
fn test_full_transfer_hands_over_everything() {
    let mut world = geometric_world(Coord::new(5.0, 0.0), 6);
    // Moving away from the destination does not matter inside its range
    world.set_waypoint(make_id(1), Some(Coord::new(5.0, 100.0)));
    world.connect(make_id(0), make_id(1)).unwrap();

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(
        outcome,
        TickOutcome::Started {
            scheme: Some(TransferScheme::Full),
            ..
        }
    ));
    world.complete_transfers().unwrap();

    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    let receiver = world.message(make_id(1), &msg_id("M1")).unwrap();
    assert_eq!(sender.geometric().unwrap(), (0, None));
    assert_eq!(receiver.geometric().unwrap(), (6, None));
}

#[test]
fn test_halve_splits_budget() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(
        outcome,
        TickOutcome::Started {
            scheme: Some(TransferScheme::Halve),
            ..
        }
    ));

    // Scheme is recorded on the sender's copy while in flight
    let in_flight = world.message(make_id(0), &msg_id("M1")).unwrap();
    assert_eq!(in_flight.geometric().unwrap(), (6, Some(TransferScheme::Halve)));

    world.complete_transfers().unwrap();
    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    let receiver = world.message(make_id(1), &msg_id("M1")).unwrap();
    assert_eq!(sender.geometric().unwrap(), (3, None));
    assert_eq!(receiver.geometric().unwrap(), (3, None));
}

#[test]
fn test_spent_budget_only_allows_full() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 0);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();

    // HALVE would apply, but there are no replicas to give
    assert_eq!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Exhausted { attempted: 0 }
    );

    world.set_position(make_id(1), Coord::new(3.0, 0.0));
    assert!(matches!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Started {
            scheme: Some(TransferScheme::Full),
            ..
        }
    ));
}

#[test]
fn test_stationary_nodes_never_replicate() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.connect(make_id(0), make_id(1)).unwrap();

    // Neither node moves: both scores are -inf and the peer has no alpha
    assert_eq!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Exhausted { attempted: 0 }
    );
}

#[test]
fn test_refused_candidate_clears_scheme_and_next_is_tried() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.set_waypoint(make_id(3), Some(Coord::new(0.0, 30.0)));
    world.create_message(make_id(0), Message::new("M2", make_id(0), make_id(2), 100)).unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();
    world.connect(make_id(0), make_id(3)).unwrap();
    world.set_accepting(make_id(1), false);

    // Contact order first: both messages to n1 are refused, then M1 to n3
    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(
        outcome,
        TickOutcome::Started { ref message, peer, .. } if *message == msg_id("M1") && peer == make_id(3)
    ));

    let m2 = world.message(make_id(0), &msg_id("M2")).unwrap();
    assert_eq!(m2.geometric().unwrap(), (6, None));
}

#[test]
fn test_cancelled_scheme_does_not_spend_budget() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();
    assert!(world.tick(make_id(0)).unwrap().started_transfer());

    world.disconnect(make_id(0), make_id(1));
    assert!(world.complete_transfers().unwrap().is_empty());
    assert!(world.message(make_id(1), &msg_id("M1")).is_none());

    // The destination shows up next; the HALVE of the lost transfer must
    // not be applied to the direct delivery
    world.connect(make_id(0), make_id(2)).unwrap();
    assert_eq!(world.tick(make_id(0)).unwrap(), TickOutcome::DirectDelivery);
    let done = world.complete_transfers().unwrap();
    assert!(done[0].delivered);

    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    assert_eq!(sender.geometric().unwrap(), (6, None));
}

#[test]
fn test_stale_scheme_cleared_on_idle_tick() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();
    assert!(world.tick(make_id(0)).unwrap().started_transfer());
    world.disconnect(make_id(0), make_id(1));

    // No contacts left, so the tick does nothing but tidy up
    assert_eq!(world.tick(make_id(0)).unwrap(), TickOutcome::Idle);
    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    assert_eq!(sender.geometric().unwrap(), (6, None));
}

#[test]
fn test_sender_completion_after_drop_is_noop() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();
    assert!(world.tick(make_id(0)).unwrap().started_transfer());

    world.remove_message(make_id(0), &msg_id("M1")).unwrap();
    world.complete_transfers().unwrap();

    let receiver = world.message(make_id(1), &msg_id("M1")).unwrap();
    assert_eq!(receiver.geometric().unwrap(), (3, None));
}

#[test]
fn test_foreign_metadata_is_a_contract_violation() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.insert_message(make_id(0), Message::new("X", make_id(0), make_id(2), 100));
    world.connect(make_id(0), make_id(1)).unwrap();

    let err = world.tick(make_id(0)).unwrap_err();
    assert!(matches!(err, RoutingError::ContractViolation { expected: "geometric", .. }));
}

#[test]
fn test_direct_delivery_comes_first() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.connect(make_id(0), make_id(2)).unwrap();

    assert_eq!(world.tick(make_id(0)).unwrap(), TickOutcome::DirectDelivery);
    let done = world.complete_transfers().unwrap();
    assert!(done[0].delivered);
    assert!(world.is_delivered(&msg_id("M1")));
    // Untagged transfer: sender budget unchanged
    let sender = world.message(make_id(0), &msg_id("M1")).unwrap();
    assert_eq!(sender.geometric().unwrap(), (6, None));
}

#[test]
fn test_busy_node_is_idle() {
    let mut world = geometric_world(Coord::new(20.0, 0.0), 6);
    world.set_waypoint(make_id(1), Some(Coord::new(10.0, 0.0)));
    world.connect(make_id(0), make_id(1)).unwrap();
    assert!(world.tick(make_id(0)).unwrap().started_transfer());
    assert_eq!(world.tick(make_id(0)).unwrap(), TickOutcome::Idle);
}

// ============================================================================
// Encounter utility
// ============================================================================

#[test]
fn test_contact_between_distinct_routers_is_symmetric() {
    let matrix = EncounterMatrix::shared();
    let mut world = line_world(3);
    for i in 0..3 {
        world.register(encounter(i, &matrix));
    }

    world.connect(make_id(0), make_id(1)).unwrap();

    assert_eq!(matrix.encounters(make_id(0), make_id(1)), 1);
    assert_eq!(matrix.encounters(make_id(1), make_id(0)), 1);
    assert_eq!(matrix.total(make_id(0)), 1);
    assert_eq!(matrix.total(make_id(1)), 1);
    assert_eq!(matrix.total(make_id(2)), 0);
    assert_eq!(matrix.population(), 3);
}

#[test]
fn test_shared_router_instance_double_counts() {
    let matrix = EncounterMatrix::shared();
    let mut world = line_world(2);
    let shared = encounter(0, &matrix);
    world.register_as(make_id(0), shared.clone());
    world.register_as(make_id(1), shared.clone());

    world.connect(make_id(0), make_id(1)).unwrap();

    // Both notifications see the same context and credit both directions
    assert_eq!(matrix.encounters(make_id(0), make_id(1)), 2);
    assert_eq!(matrix.encounters(make_id(1), make_id(0)), 2);
    assert_eq!(matrix.total(make_id(0)), 2);
    assert_eq!(matrix.total(make_id(1)), 2);
}

#[test]
fn test_same_routing_context_predicate() {
    let matrix = EncounterMatrix::shared();
    let a = encounter(0, &matrix);
    let b = encounter(1, &matrix);
    let a2: Arc<dyn RoutingStrategy> = a.clone();

    assert!(same_routing_context(a.as_ref(), a2.as_ref()));
    assert!(!same_routing_context(a.as_ref(), b.as_ref()));
}

/// Destination n3 at the origin; n1 close to it, n2 far away, sender n0 between
fn encounter_world(matrix: &Arc<EncounterMatrix>) -> MockWorld {
    let mut world = MockWorld::new();
    world.add_host(make_id(0), Coord::new(50.0, 0.0), 10.0);
    world.add_host(make_id(1), Coord::new(5.0, 0.0), 10.0);
    world.add_host(make_id(2), Coord::new(60.0, 0.0), 10.0);
    world.add_host(make_id(3), Coord::new(0.0, 0.0), 10.0);
    for i in 0..4 {
        world.register(encounter(i, matrix));
    }
    world
}

#[test]
fn test_forwards_to_peer_that_met_destination() {
    let matrix = EncounterMatrix::shared();
    let mut world = encounter_world(&matrix);
    brief_contact(&mut world, 1, 3);

    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(3), 100))
        .unwrap();
    world.connect(make_id(0), make_id(1)).unwrap();
    world.connect(make_id(0), make_id(2)).unwrap();

    let outcome = world.tick(make_id(0)).unwrap();
    assert!(matches!(outcome, TickOutcome::Started { peer, .. } if peer == make_id(1)));

    world.complete_transfers().unwrap();
    // No budget: the sender keeps its copy
    assert!(world.message(make_id(0), &msg_id("M1")).is_some());
    assert!(world.message(make_id(1), &msg_id("M1")).is_some());
}

#[test]
fn test_peer_that_never_met_destination_is_skipped() {
    let matrix = EncounterMatrix::shared();
    let mut world = encounter_world(&matrix);
    brief_contact(&mut world, 1, 3);

    world
        .create_message(make_id(0), Message::new("M1", make_id(0), make_id(3), 100))
        .unwrap();
    world.connect(make_id(0), make_id(2)).unwrap();

    assert_eq!(
        world.tick(make_id(0)).unwrap(),
        TickOutcome::Exhausted { attempted: 0 }
    );
}

#[test]
fn test_encounter_diagnostics() {
    let matrix = EncounterMatrix::shared();
    let mut world = encounter_world(&matrix);
    brief_contact(&mut world, 0, 1);
    brief_contact(&mut world, 0, 1);

    let info = world.diagnostics(make_id(0)).unwrap();
    let encounters = info.child_starting_with("2 encounter(s)").unwrap();
    assert_eq!(encounters.children()[0].text(), "n1 : 2");
}
