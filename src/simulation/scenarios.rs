//! End-to-end protocol scenarios on small topologies.
//!
//! Grid positions are given as (row, column) in the scenario descriptions;
//! a node at (row r, column c) sits at `Point { x: c, y: r }`.

use std::sync::Arc;

use super::mac::MacConfig;
use super::network::Network;
use super::stats;
use super::trace::MemoryTrace;
use super::types::{InterfaceId, NodeId, Point, Status};
use super::variate::RandomVariate;

const RADIUS: f64 = 1.1;

fn grid(row: f64, column: f64) -> Point {
    Point::new(column, row)
}

fn iface(network: &Network, node: NodeId) -> InterfaceId {
    network.node(node).interface.unwrap()
}

fn with_interface(network: &mut Network, node: NodeId, radius: f64) {
    let name = format!("Interface_{}", network.node(node).name);
    network.add_interface(node, name, radius);
}

#[test]
fn two_nodes_exchange_one_frame() {
    let mut network = Network::new(MacConfig::default(), 11);
    let arrival = Arc::new(RandomVariate::sequence(vec![1.0, 1000.0, 2000.0]));
    let s = network.add_source("S", grid(0.0, 0.0), arrival, 1);
    let d = network.add_node("D", grid(1.0, 0.0));
    network.add_destination(s, d).unwrap();
    with_interface(&mut network, s, RADIUS);
    with_interface(&mut network, d, RADIUS);
    network.connect_in_range();
    let trace = MemoryTrace::new();
    network.set_trace(Some(Box::new(trace.clone())));
    network.init_run().unwrap();
    let (si, di) = (iface(&network, s), iface(&network, d));

    assert_eq!(network.step().unwrap(), 1);
    assert_eq!(network.status(si), Status::WaitingForDifs);
    assert_eq!(network.status(di), Status::Idle);

    assert_eq!(network.step().unwrap(), 29);
    assert_eq!(network.status(si), Status::SendingMessage);
    assert_eq!(network.status(di), Status::ReceivingMessage);

    assert_eq!(network.step().unwrap(), 29 + 512);
    assert_eq!(network.status(si), Status::WaitingForAck);
    assert_eq!(network.status(di), Status::WaitingForSifs);
    assert_eq!(network.node(d).consumed, 1);

    assert_eq!(network.step().unwrap(), 551);
    assert_eq!(network.status(di), Status::SendingAck);
    assert_eq!(network.status(si), Status::ReceivingMessage);

    assert_eq!(network.step().unwrap(), 561);
    assert_eq!(network.status(si), Status::Idle);
    assert_eq!(network.status(di), Status::Idle);
    assert_eq!(network.interface(si).head_id(), None);
    assert!(network.next_event_time().unwrap_err().is_quiescent());

    assert_eq!(
        trace.statuses_of("Interface_S"),
        vec!["WAITING_FOR_DIFS", "SENDING_MESSAGE", "WAITING_FOR_ACK", "RECEIVING_MESSAGE", "IDLE"]
    );
    assert_eq!(trace.statuses_of("Interface_D"), vec!["RECEIVING_MESSAGE", "WAITING_FOR_SIFS", "SENDING_ACK", "IDLE"]);

    let report = network.end_run();
    assert_eq!(report.counters.get(stats::ACK_TIMEOUTS), 0);
    assert_eq!(report.counters.get(stats::COLLISIONS), 0);
}

#[test]
fn frames_are_forwarded_hop_by_hop() {
    let mut network = Network::new(MacConfig::default(), 12);
    let arrival = Arc::new(RandomVariate::sequence(vec![1.0]));
    let s = network.add_source("S", grid(0.0, 0.0), arrival, 1);
    let n = network.add_node("N", grid(1.0, 0.0));
    let d = network.add_node("D", grid(2.0, 0.0));
    network.add_destination(s, d).unwrap();
    for node in [s, n, d] {
        with_interface(&mut network, node, RADIUS);
    }
    network.connect_in_range();
    network.init_run().unwrap();
    network.run_until_idle().unwrap();

    assert_eq!(network.node(d).consumed, 1);
    assert_eq!(network.node(n).consumed, 0);
    assert_eq!(network.node(s).consumed, 0);
    assert_eq!(network.stats().get(stats::FORWARDED), 1);
    assert_eq!(network.stats().get(stats::ACKS_SENT), 2);
    for node in [s, n, d] {
        assert_eq!(network.status(iface(&network, node)), Status::Idle);
    }
}

#[test]
fn hidden_terminals_eventually_deliver() {
    let mut network = Network::new(MacConfig::default(), 13);
    let arrival = Arc::new(RandomVariate::sequence(vec![10.0, 50.0]));
    let period = Arc::new(RandomVariate::delta(100.0));
    let s1 = network.add_source("S1", grid(0.0, 1.0), Arc::clone(&arrival), 1);
    let s2 = network.add_source("S2", grid(1.0, 0.0), Arc::clone(&arrival), 1);
    let d = network.add_node("D", grid(1.0, 1.0));
    for source in [s1, s2] {
        network.add_destination(source, d).unwrap();
        network.set_period(source, Arc::clone(&period)).unwrap();
    }
    for node in [s1, s2, d] {
        with_interface(&mut network, node, RADIUS);
    }
    network.connect_in_range();
    // The two sources cannot hear each other.
    assert!(!network.medium(network.interface(iface(&network, s1)).medium).contains(iface(&network, s2)));

    network.init_run().unwrap();
    network.run_until_idle().unwrap();

    assert_eq!(network.node(d).consumed, 2);
    assert_eq!(network.node(s1).produced(), 1);
    assert_eq!(network.node(s2).produced(), 1);
    assert_eq!(network.node(s1).consumed, 0);
    assert_eq!(network.node(s2).consumed, 0);
    assert!(network.stats().get(stats::COLLISIONS) >= 1);
    assert!(network.interface(iface(&network, d)).corrupted >= 1);
}

#[test]
fn contending_sources_back_off_and_all_deliver() {
    let mut network = Network::new(MacConfig::default(), 14);
    let arrival = Arc::new(RandomVariate::sequence(vec![10.0, 20.0, 70.0]));
    let sources: Vec<NodeId> = [0.0, 0.1, 0.2]
        .iter()
        .enumerate()
        .map(|(i, column)| network.add_source(format!("S{}", i + 1), grid(0.0, *column), Arc::clone(&arrival), 1))
        .collect();
    let d = network.add_node("D", grid(0.0, 0.5));
    for &source in &sources {
        network.add_destination(source, d).unwrap();
        with_interface(&mut network, source, 5.0);
    }
    with_interface(&mut network, d, 5.0);
    network.connect_in_range();
    network.init_run().unwrap();

    assert_eq!(network.step().unwrap(), 10);
    assert_eq!(network.step().unwrap(), 20);
    assert_eq!(network.step().unwrap(), 38);
    assert_eq!(network.status(iface(&network, sources[0])), Status::SendingMessage);
    assert_eq!(network.status(iface(&network, sources[1])), Status::WaitingForDifs);
    assert_eq!(network.step().unwrap(), 48);
    assert_eq!(network.status(iface(&network, sources[1])), Status::WaitingForBackoff);

    network.run_to(50_000).unwrap();
    for &node in sources.iter().chain([d].iter()) {
        assert_eq!(network.status(iface(&network, node)), Status::Idle);
    }
    assert_eq!(network.node(d).consumed, 3);
}

#[test]
fn periodic_source_respects_period_and_maximum() {
    let mut network = Network::new(MacConfig::default(), 15);
    let s = network.add_source("S", grid(0.0, 0.0), Arc::new(RandomVariate::sequence(vec![10.0])), 100);
    let d = network.add_node("D", grid(0.0, 1.0));
    network.add_destination(s, d).unwrap();
    network.set_period(s, Arc::new(RandomVariate::delta(100.0))).unwrap();
    with_interface(&mut network, s, RADIUS);
    with_interface(&mut network, d, RADIUS);
    network.connect_in_range();
    network.init_run().unwrap();

    network.run_to(11).unwrap();
    assert_eq!(network.node(s).produced(), 1);
    network.run_to(109).unwrap();
    assert_eq!(network.node(s).produced(), 1);
    network.run_to(111).unwrap();
    assert_eq!(network.node(s).produced(), 2);

    network.run_until_idle().unwrap();
    assert_eq!(network.node(s).produced(), 100);
    assert_eq!(network.node(d).consumed, 100);
    assert_eq!(network.stats().get(stats::DELIVERED), 100);
}

#[test]
fn simultaneous_productions_fire_in_creation_order() {
    let mut network = Network::new(MacConfig::default(), 16);
    let arrival = Arc::new(RandomVariate::delta(5.0));
    let d = network.add_node("D", grid(5.0, 5.0));
    let sources: Vec<NodeId> = (0..3)
        .map(|i| network.add_source(format!("S{}", i), grid(5.0, i as f64), Arc::clone(&arrival), 1))
        .collect();
    with_interface(&mut network, d, 10.0);
    for &source in &sources {
        network.add_destination(source, d).unwrap();
        with_interface(&mut network, source, 10.0);
    }
    network.connect_in_range();
    let trace = MemoryTrace::new();
    network.set_trace(Some(Box::new(trace.clone())));
    network.init_run().unwrap();

    assert_eq!(network.step().unwrap(), 5);
    assert_eq!(
        trace.lines(),
        vec![
            "5\tInterface_S0\tWAITING_FOR_DIFS",
            "5\tInterface_S1\tWAITING_FOR_DIFS",
            "5\tInterface_S2\tWAITING_FOR_DIFS",
        ]
    );
}
