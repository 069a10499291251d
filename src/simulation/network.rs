//! Network arena and event loop.
//!
//! `Network` owns every entity of a simulation and the scheduler that
//! drives them:
//! - Nodes, interfaces and media live in vectors addressed by handles
//! - Every pending action is a [`SimEvent`] in the scheduler
//! - `step` fires all events of the next time point, in post order
//! - `init_run`/`end_run` bracket a run and reset all state in between
//!
//! MAC transitions are implemented in [`mac`](super::mac).

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

use super::error::SimError;
use super::geometry::in_range;
use super::interface::{MacTimer, WifiInterface};
use super::mac::MacConfig;
use super::medium::BroadcastMedium;
use super::message::Message;
use super::node::{Node, TrafficSource};
use super::scheduler::Scheduler;
use super::stats::{self, InterfaceReport, NodeReport, RunReport, Statistics};
use super::trace::TraceSink;
use super::types::{InterfaceId, MediumId, NodeId, Point, Status, Tick};
use super::variate::RandomVariate;

/// Largest correlation id drawn for a new frame.
const MAX_MESSAGE_ID: u32 = 32767;

/// Payload of a scheduled event.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A traffic source produces its next frame.
    Produce(NodeId),
    /// A MAC timer of an interface expired.
    Mac(InterfaceId, MacTimer),
    /// A frame received for another node re-enters `send` on this interface.
    Forward(InterfaceId, Message),
}

pub struct Network {
    pub(super) config: MacConfig,
    pub(super) scheduler: Scheduler<SimEvent>,
    pub(super) rng: StdRng,
    pub(super) nodes: Vec<Node>,
    pub(super) interfaces: Vec<WifiInterface>,
    pub(super) media: Vec<BroadcastMedium>,
    pub(super) trace: Option<Box<dyn TraceSink>>,
    pub(super) stats: Statistics,
    started_at: String,
}

impl Network {
    pub fn new(config: MacConfig, seed: u64) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(),
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            interfaces: Vec::new(),
            media: Vec::new(),
            trace: None,
            stats: Statistics::default(),
            started_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Restart the random stream, e.g. to make each run of a sweep reproducible on its own.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn config(&self) -> &MacConfig {
        &self.config
    }

    // ---- topology -------------------------------------------------------

    pub fn add_node(&mut self, name: impl Into<String>, position: Point) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, position));
        id
    }

    /// Add a node that produces up to `max_messages` frames, the first one
    /// `arrival` ticks after the start of a run.
    pub fn add_source(&mut self, name: impl Into<String>, position: Point, arrival: Arc<RandomVariate>, max_messages: u64) -> NodeId {
        let id = self.add_node(name, position);
        self.nodes[id.0].traffic = Some(TrafficSource::new(arrival, max_messages));
        id
    }

    fn traffic_mut(&mut self, node: NodeId) -> Result<&mut TrafficSource, SimError> {
        let entry = &mut self.nodes[node.0];
        entry.traffic.as_mut().ok_or_else(|| SimError::NotASource(entry.name.clone()))
    }

    /// Set the delay between productions after the first one.
    pub fn set_period(&mut self, node: NodeId, period: Arc<RandomVariate>) -> Result<(), SimError> {
        self.traffic_mut(node)?.period = Some(period);
        Ok(())
    }

    pub fn set_message_length(&mut self, node: NodeId, length: u32) -> Result<(), SimError> {
        self.traffic_mut(node)?.message_length = length;
        Ok(())
    }

    pub fn add_destination(&mut self, node: NodeId, destination: NodeId) -> Result<(), SimError> {
        let traffic = self.traffic_mut(node)?;
        if !traffic.destinations.contains(&destination) {
            traffic.destinations.push(destination);
        }
        Ok(())
    }

    /// Attach a wireless interface to `node`, together with the medium it
    /// transmits on. The medium starts without members.
    ///
    /// # Parameters
    ///
    /// * `node` - Owner of the interface
    /// * `name` - Name used in traces and reports
    /// * `radius` - Transmission range used by [`connect_in_range`](Self::connect_in_range)
    ///
    /// # Returns
    ///
    /// The handle of the new interface.
    pub fn add_interface(&mut self, node: NodeId, name: impl Into<String>, radius: f64) -> InterfaceId {
        let iface = InterfaceId(self.interfaces.len());
        let medium = MediumId(self.media.len());
        self.media.push(BroadcastMedium::new(format!("Link_{}", self.nodes[node.0].name)));
        self.interfaces.push(WifiInterface::new(iface, name, node, medium, radius, self.config.cw_min));
        self.nodes[node.0].interface = Some(iface);
        iface
    }

    pub fn add_member(&mut self, medium: MediumId, iface: InterfaceId) -> bool {
        self.media[medium.0].add_member(iface)
    }

    /// Make every interface hear every other interface closer than the
    /// sender's radius.
    pub fn connect_in_range(&mut self) {
        for from in 0..self.interfaces.len() {
            let sender = &self.interfaces[from];
            let origin = self.nodes[sender.node.0].position;
            let (medium, radius) = (sender.medium, sender.radius);
            for to in 0..self.interfaces.len() {
                if to == from {
                    continue;
                }
                let position = self.nodes[self.interfaces[to].node.0].position;
                if in_range(&origin, &position, radius) {
                    self.media[medium.0].add_member(InterfaceId(to));
                }
            }
        }
    }

    // ---- accessors ------------------------------------------------------

    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    pub fn next_event_time(&self) -> Result<Tick, SimError> {
        Ok(self.scheduler.next_event_time()?)
    }

    pub fn status(&self, iface: InterfaceId) -> Status {
        self.interfaces[iface.0].status
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn interface(&self, id: InterfaceId) -> &WifiInterface {
        &self.interfaces[id.0]
    }

    pub fn interfaces(&self) -> &[WifiInterface] {
        &self.interfaces
    }

    pub fn medium(&self, id: MediumId) -> &BroadcastMedium {
        &self.media[id.0]
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub(super) fn position_of(&self, iface: InterfaceId) -> Point {
        self.nodes[self.interfaces[iface.0].node.0].position
    }

    // ---- runs -----------------------------------------------------------

    /// Install (or remove) the sink receiving interface status changes.
    pub fn set_trace(&mut self, trace: Option<Box<dyn TraceSink>>) {
        self.trace = trace;
    }

    /// Reset every entity and schedule the first production of each source,
    /// in node creation order.
    pub fn init_run(&mut self) -> Result<(), SimError> {
        self.scheduler.reset();
        self.stats.reset();
        for interface in &mut self.interfaces {
            interface.reset(self.config.cw_min);
        }
        for node in &mut self.nodes {
            node.reset();
        }
        self.started_at = chrono::Local::now().to_rfc3339();

        for index in 0..self.nodes.len() {
            let Some(traffic) = self.nodes[index].traffic.as_ref() else {
                continue;
            };
            if traffic.exhausted() {
                continue;
            }
            let delay = to_ticks(traffic.arrival.draw(&mut self.rng));
            self.scheduler.post(delay, SimEvent::Produce(NodeId(index)))?;
        }
        log::info!("Run initialised: {} nodes, {} interfaces, {} pending events", self.nodes.len(), self.interfaces.len(), self.scheduler.len());
        Ok(())
    }

    /// Close the current run and collect its report.
    pub fn end_run(&mut self) -> RunReport {
        if let Some(trace) = self.trace.as_mut() {
            trace.flush();
        }
        let report = RunReport {
            started_at: self.started_at.clone(),
            end_time: self.now(),
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeReport { name: n.name.clone(), produced: n.produced(), consumed: n.consumed })
                .collect(),
            interfaces: self
                .interfaces
                .iter()
                .map(|i| InterfaceReport { name: i.name.clone(), corrupted: i.corrupted, final_status: i.status })
                .collect(),
            counters: self.stats.clone(),
        };
        log::info!(
            "Run finished at t={}: produced {}, consumed {}, collisions {}",
            report.end_time,
            report.total_produced(),
            report.total_consumed(),
            self.stats.get(stats::COLLISIONS)
        );
        report
    }

    /// Fire every event of the next time point, including events posted
    /// with zero delay while it is processed.
    ///
    /// # Returns
    ///
    /// The time point that was processed, or `NoMoreEvents` once the
    /// simulation is idle.
    pub fn step(&mut self) -> Result<Tick, SimError> {
        let time = self.scheduler.next_event_time()?;
        self.scheduler.advance_to(time);
        while let Some((id, event)) = self.scheduler.pop_due() {
            if let SimEvent::Mac(iface, timer) = &event {
                let slot = self.interfaces[iface.0].timers.slot(*timer);
                if *slot == Some(id) {
                    *slot = None;
                }
            }
            self.dispatch(event)?;
        }
        Ok(time)
    }

    /// Process every event up to and including `limit`, then move the clock
    /// to `limit`. Stops early without error when the queue drains.
    pub fn run_to(&mut self, limit: Tick) -> Result<Tick, SimError> {
        while matches!(self.scheduler.next_event_time(), Ok(time) if time <= limit) {
            self.step()?;
        }
        self.scheduler.advance_to(limit);
        Ok(self.now())
    }

    /// Step until no events remain. Returns the time of the last event.
    pub fn run_until_idle(&mut self) -> Result<Tick, SimError> {
        while self.scheduler.next_event_time().is_ok() {
            self.step()?;
        }
        Ok(self.now())
    }

    fn dispatch(&mut self, event: SimEvent) -> Result<(), SimError> {
        match event {
            SimEvent::Produce(node) => self.produce(node),
            SimEvent::Mac(iface, timer) => self.on_timer(iface, timer),
            SimEvent::Forward(iface, message) => self.send(iface, message),
        }
    }

    // ---- traffic --------------------------------------------------------

    /// Create one frame at `node` and hand it to the node's interface.
    ///
    /// Does nothing once the source reached its maximum. Otherwise schedules
    /// the next production while the maximum is not reached.
    pub fn produce(&mut self, node: NodeId) -> Result<(), SimError> {
        let entry = &self.nodes[node.0];
        let traffic = entry.traffic.as_ref().ok_or_else(|| SimError::NotASource(entry.name.clone()))?;
        if traffic.exhausted() {
            return Ok(());
        }
        if traffic.destinations.is_empty() {
            return Err(SimError::NoDestination(entry.name.clone()));
        }
        let iface = entry.interface.ok_or_else(|| SimError::NoInterface(entry.name.clone()))?;

        let destination = traffic.destinations[self.rng.gen_range(0..traffic.destinations.len())];
        let id = self.rng.gen_range(0..=MAX_MESSAGE_ID);
        let message = Message::data(id, traffic.message_length, node, destination);
        log::debug!("t={} {} produces frame {} for {}", self.now(), entry.name, id, self.nodes[destination.0].name);
        self.send(iface, message)?;

        let Some(traffic) = self.nodes[node.0].traffic.as_mut() else {
            return Ok(());
        };
        traffic.produced += 1;
        if traffic.exhausted() {
            return Ok(());
        }
        let delay = to_ticks(traffic.next_delay().draw(&mut self.rng));
        self.scheduler.post_after(delay, SimEvent::Produce(node))?;
        Ok(())
    }

    /// Hand a frame to its final destination.
    pub fn put(&mut self, node: NodeId, message: Message) {
        let entry = &mut self.nodes[node.0];
        entry.consumed += 1;
        self.stats.increment(stats::DELIVERED);
        log::debug!("t={} {} consumed frame {}", self.scheduler.now(), entry.name, message.id);
    }
}

/// Round a drawn delay to whole ticks.
fn to_ticks(value: f64) -> Tick {
    if value.is_finite() && value > 0.0 { value.round() as Tick } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::trace::MemoryTrace;

    #[test]
    fn connect_in_range_uses_the_sender_radius() {
        let mut network = Network::new(MacConfig::default(), 0);
        let a = network.add_node("a", Point::new(0.0, 0.0));
        let b = network.add_node("b", Point::new(2.0, 0.0));
        let ai = network.add_interface(a, "Interface_a", 3.0);
        let bi = network.add_interface(b, "Interface_b", 1.0);
        network.connect_in_range();
        assert_eq!(network.medium(network.interface(ai).medium).members(), &[bi]);
        assert!(network.medium(network.interface(bi).medium).is_empty());
        assert_eq!(network.medium(network.interface(ai).medium).name, "Link_a");
    }

    #[test]
    fn produce_reports_configuration_errors() {
        let mut network = Network::new(MacConfig::default(), 0);
        let s = network.add_source("s", Point::new(0.0, 0.0), Arc::new(RandomVariate::delta(1.0)), 1);
        let d = network.add_node("d", Point::new(1.0, 0.0));
        assert!(matches!(network.produce(s), Err(SimError::NoDestination(_))));
        network.add_destination(s, d).unwrap();
        assert!(matches!(network.produce(s), Err(SimError::NoInterface(_))));
        assert!(matches!(network.set_period(d, Arc::new(RandomVariate::delta(1.0))), Err(SimError::NotASource(_))));
    }

    #[test]
    fn exhausted_source_does_not_produce() {
        let mut network = Network::new(MacConfig::default(), 0);
        let s = network.add_source("s", Point::new(0.0, 0.0), Arc::new(RandomVariate::delta(1.0)), 0);
        network.init_run().unwrap();
        assert!(network.produce(s).is_ok());
        assert_eq!(network.node(s).produced(), 0);
        assert!(network.next_event_time().unwrap_err().is_quiescent());
    }

    #[test]
    fn run_to_advances_the_clock_past_the_last_event() {
        let mut network = Network::new(MacConfig::default(), 0);
        network.init_run().unwrap();
        assert_eq!(network.run_to(500).unwrap(), 500);
        assert!(network.step().unwrap_err().is_quiescent());
    }

    #[test]
    fn init_run_resets_state_between_runs() {
        let mut network = Network::new(MacConfig::default(), 5);
        let s = network.add_source("s", Point::new(0.0, 0.0), Arc::new(RandomVariate::delta(10.0)), 1);
        let d = network.add_node("d", Point::new(1.0, 0.0));
        network.add_destination(s, d).unwrap();
        network.add_interface(s, "Interface_s", 1.5);
        network.add_interface(d, "Interface_d", 1.5);
        network.connect_in_range();
        let trace = MemoryTrace::new();
        network.set_trace(Some(Box::new(trace.clone())));

        for _ in 0..2 {
            network.init_run().unwrap();
            network.run_until_idle().unwrap();
            let report = network.end_run();
            assert_eq!(report.total_produced(), 1);
            assert_eq!(report.total_consumed(), 1);
            assert_eq!(report.counters.get(stats::FRAMES_SENT), 1);
            assert_eq!(report.counters.get(stats::ACKS_SENT), 1);
        }
        let first = trace.statuses_of("Interface_s");
        assert_eq!(first.first().map(String::as_str), Some("WAITING_FOR_DIFS"));
        assert_eq!(first.last().map(String::as_str), Some("IDLE"));
    }
}
