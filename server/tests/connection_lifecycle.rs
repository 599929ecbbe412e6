//! Slot table lifecycle: handshake acceptance and rejection, endpoint
//! reuse, heartbeat refresh and timeout eviction. Time is passed in as
//! milliseconds so every case is deterministic.

use std::net::SocketAddr;

use aster_server::{ConnectOutcome, SlotTable};

fn endpoint(port: u16) -> SocketAddr {
    format!("127.0.0.1:{}", port).parse().unwrap()
}

#[test]
fn accept_assigns_sequential_player_ids_and_populates_the_table() {
    let mut table = SlotTable::new(16);
    let outcome = table.connect(endpoint(5001), 777, "Ada", 0);
    assert_eq!(outcome, ConnectOutcome::Accepted(1));
    assert_eq!(table.connect(endpoint(5002), 778, "Grace", 0), ConnectOutcome::Accepted(2));

    assert_eq!(table.active_count(), 2);
    assert_eq!(table.active_players(), vec![1, 2]);
    assert_eq!(table.player_at(endpoint(5001)), Some(1));
    assert_eq!(table.endpoint_of(2), Some(endpoint(5002)));
}

#[test]
fn full_table_rejects_without_allocating() {
    let mut table = SlotTable::new(1);
    assert_eq!(table.connect(endpoint(5001), 1, "Ada", 0), ConnectOutcome::Accepted(1));
    assert_eq!(
        table.connect(endpoint(5002), 2, "Late", 0),
        ConnectOutcome::ServerFull
    );
    assert_eq!(table.active_count(), 1);
    assert_eq!(table.player_at(endpoint(5002)), None);
}

#[test]
fn reconnect_from_known_endpoint_reuses_the_slot() {
    let mut table = SlotTable::new(4);
    assert_eq!(table.connect(endpoint(5001), 1, "Ada", 0), ConnectOutcome::Accepted(1));
    // Retry (e.g. the accept was lost) refreshes the heartbeat instead of
    // burning a second slot.
    assert_eq!(
        table.connect(endpoint(5001), 1, "Ada", 5_000),
        ConnectOutcome::AlreadyConnected(1)
    );
    assert_eq!(table.active_count(), 1);
    // The refreshed heartbeat keeps the slot alive past the original
    // deadline.
    assert!(table.evict_timed_out(10_500, 10_000).is_empty());
}

#[test]
fn heartbeat_refresh_prevents_eviction() {
    let mut table = SlotTable::new(4);
    table.connect(endpoint(5001), 1, "Ada", 0);
    assert!(table.heartbeat(endpoint(5001), 9_000));
    assert!(table.evict_timed_out(12_000, 10_000).is_empty());
    assert!(!table.heartbeat(endpoint(5999), 9_000));
}

#[test]
fn timeout_evicts_exactly_the_silent_slot() {
    let mut table = SlotTable::new(4);
    table.connect(endpoint(5001), 1, "Quiet", 0);
    table.connect(endpoint(5002), 2, "Chatty", 0);
    table.heartbeat(endpoint(5002), 11_000);

    let evicted = table.evict_timed_out(11_000, 10_000);
    assert_eq!(evicted, vec![1]);
    assert_eq!(table.active_players(), vec![2]);
    assert_eq!(table.player_at(endpoint(5001)), None);

    // A second sweep finds nothing: one timeout, one eviction.
    assert!(table.evict_timed_out(11_001, 10_000).is_empty());
}

#[test]
fn freed_slot_is_reusable_with_a_fresh_player_id() {
    let mut table = SlotTable::new(1);
    assert_eq!(table.connect(endpoint(5001), 1, "Ada", 0), ConnectOutcome::Accepted(1));
    assert_eq!(table.disconnect(endpoint(5001)), Some(1));
    assert_eq!(table.active_count(), 0);
    // Slot is free again; player ids are never recycled.
    assert_eq!(table.connect(endpoint(5002), 2, "Next", 0), ConnectOutcome::Accepted(2));
}

#[test]
fn fan_out_targets_respect_exclusion() {
    let mut table = SlotTable::new(4);
    table.connect(endpoint(5001), 1, "A", 0);
    table.connect(endpoint(5002), 2, "B", 0);
    table.connect(endpoint(5003), 3, "C", 0);

    let all = table.endpoints_except(None);
    assert_eq!(all.len(), 3);

    let without_two = table.endpoints_except(Some(2));
    assert_eq!(without_two.len(), 2);
    assert!(!without_two.contains(&endpoint(5002)));
}

#[test]
fn disconnect_of_unknown_endpoint_is_a_noop() {
    let mut table = SlotTable::new(2);
    assert_eq!(table.disconnect(endpoint(5009)), None);
}
