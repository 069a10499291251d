//! Type definitions for the simulation.
//!
//! Contains the small value types shared across the simulation:
//! - Simulated time (`Tick`)
//! - Arena handles for nodes, interfaces and media
//! - Node positions
//! - MAC interface status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete unit of simulated time.
pub type Tick = u64;

/// Handle of a node inside a [`Network`](super::network::Network) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle of a wireless interface inside a network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub usize);

/// Handle of a broadcast medium inside a network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediumId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interface#{}", self.0)
    }
}

impl fmt::Display for MediumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "medium#{}", self.0)
    }
}

/// Simple 2D point.
///
/// The grid routing treats `y` as the row and `x` as the column: "right"
/// means a larger `x`, "down" means a larger `y`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both points lie on the same grid row.
    pub fn same_row(&self, other: &Point) -> bool {
        (self.y - other.y).abs() < f64::EPSILON
    }

    /// Whether both points lie on the same grid column.
    pub fn same_column(&self, other: &Point) -> bool {
        (self.x - other.x).abs() < f64::EPSILON
    }
}

/// MAC state of a wireless interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Idle,
    WaitingForDifs,
    WaitingForBackoff,
    SendingMessage,
    WaitingForAck,
    ReceivingMessage,
    WaitingForSifs,
    SendingAck,
}

impl Status {
    /// Name used in trace lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "IDLE",
            Status::WaitingForDifs => "WAITING_FOR_DIFS",
            Status::WaitingForBackoff => "WAITING_FOR_BACKOFF",
            Status::SendingMessage => "SENDING_MESSAGE",
            Status::WaitingForAck => "WAITING_FOR_ACK",
            Status::ReceivingMessage => "RECEIVING_MESSAGE",
            Status::WaitingForSifs => "WAITING_FOR_SIFS",
            Status::SendingAck => "SENDING_ACK",
        }
    }

    /// True while the radio is transmitting or committed to transmit an ACK,
    /// i.e. it cannot hear anything on the medium.
    pub fn is_deaf(&self) -> bool {
        matches!(self, Status::SendingMessage | Status::SendingAck | Status::WaitingForSifs)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_columns_follow_grid_axes() {
        let a = Point::new(0.0, 1.0);
        let b = Point::new(3.0, 1.0);
        let c = Point::new(0.0, 4.0);
        assert!(a.same_row(&b));
        assert!(!a.same_column(&b));
        assert!(a.same_column(&c));
        assert!(!a.same_row(&c));
    }

    #[test]
    fn status_names_match_trace_format() {
        assert_eq!(Status::WaitingForDifs.to_string(), "WAITING_FOR_DIFS");
        assert_eq!(Status::SendingAck.as_str(), "SENDING_ACK");
        assert!(Status::WaitingForSifs.is_deaf());
        assert!(!Status::WaitingForAck.is_deaf());
    }
}
