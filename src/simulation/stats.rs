//! Named run counters and the end-of-run report.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{Status, Tick};

pub const COLLISIONS: &str = "collisions";
pub const FRAMES_SENT: &str = "frames_sent";
pub const ACKS_SENT: &str = "acks_sent";
pub const ACK_TIMEOUTS: &str = "ack_timeouts";
pub const DELIVERED: &str = "delivered";
pub const FORWARDED: &str = "forwarded";
pub const DEFERRALS: &str = "deferrals";
pub const MISSED: &str = "missed";

const ALL: [&str; 8] = [COLLISIONS, FRAMES_SENT, ACKS_SENT, ACK_TIMEOUTS, DELIVERED, FORWARDED, DEFERRALS, MISSED];

/// Counters keyed by name. Every known counter is present, starting at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Statistics {
    counters: BTreeMap<&'static str, u64>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self { counters: ALL.iter().map(|name| (*name, 0)).collect() }
    }
}

impl Statistics {
    pub fn increment(&mut self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub name: String,
    pub produced: u64,
    pub consumed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceReport {
    pub name: String,
    pub corrupted: u64,
    pub final_status: Status,
}

/// Snapshot taken by `Network::end_run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub end_time: Tick,
    pub nodes: Vec<NodeReport>,
    pub interfaces: Vec<InterfaceReport>,
    pub counters: Statistics,
}

impl RunReport {
    pub fn total_produced(&self) -> u64 {
        self.nodes.iter().map(|n| n.produced).sum()
    }

    pub fn total_consumed(&self) -> u64 {
        self.nodes.iter().map(|n| n.consumed).sum()
    }
}
