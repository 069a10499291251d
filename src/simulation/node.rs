//! Traffic endpoints.
//!
//! A `Node` consumes frames addressed to it. A node carrying a
//! `TrafficSource` also produces frames toward a fixed set of destinations.

use std::sync::Arc;

use super::types::{InterfaceId, NodeId, Point};
use super::variate::RandomVariate;

/// Default data frame length, in ticks of transmission time.
pub const DEFAULT_MESSAGE_LENGTH: u32 = 512;

#[derive(Debug, Clone)]
pub struct TrafficSource {
    pub destinations: Vec<NodeId>,
    /// Delay before the first production.
    pub arrival: Arc<RandomVariate>,
    /// Delay between productions; `arrival` is used when unset.
    pub period: Option<Arc<RandomVariate>>,
    pub produced: u64,
    pub max_messages: u64,
    pub message_length: u32,
}

impl TrafficSource {
    pub fn new(arrival: Arc<RandomVariate>, max_messages: u64) -> Self {
        Self {
            destinations: Vec::new(),
            arrival,
            period: None,
            produced: 0,
            max_messages,
            message_length: DEFAULT_MESSAGE_LENGTH,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.produced >= self.max_messages
    }

    /// Variate for the next inter-production delay.
    pub fn next_delay(&self) -> &RandomVariate {
        self.period.as_deref().unwrap_or(self.arrival.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub position: Point,
    pub consumed: u64,
    pub interface: Option<InterfaceId>,
    pub traffic: Option<TrafficSource>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            consumed: 0,
            interface: None,
            traffic: None,
        }
    }

    pub fn produced(&self) -> u64 {
        self.traffic.as_ref().map_or(0, |t| t.produced)
    }

    pub fn reset(&mut self) {
        self.consumed = 0;
        if let Some(traffic) = self.traffic.as_mut() {
            traffic.produced = 0;
            traffic.arrival.rewind();
            if let Some(period) = traffic.period.as_ref() {
                period.rewind();
            }
        }
    }
}
