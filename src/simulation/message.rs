//! Frames exchanged over the broadcast medium.

use super::types::{InterfaceId, NodeId, Tick};

/// A data frame or an acknowledgement.
///
/// The interface fields are stamped by `send`: `source_interface` is the
/// transmitting interface and `dest_interface` the next hop chosen by
/// routing. `source_node`/`dest_node` are the end-to-end endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub length: u32,
    pub transmission_time: Tick,
    pub id: u32,
    pub ack: bool,
    pub source_node: NodeId,
    pub dest_node: NodeId,
    pub source_interface: Option<InterfaceId>,
    pub dest_interface: Option<InterfaceId>,
}

impl Message {
    /// New data frame. Transmission takes one tick per length unit.
    pub fn data(id: u32, length: u32, source_node: NodeId, dest_node: NodeId) -> Self {
        Self {
            length,
            transmission_time: length as Tick,
            id,
            ack: false,
            source_node,
            dest_node,
            source_interface: None,
            dest_interface: None,
        }
    }

    /// Acknowledgement for `self`, sent by `from` back to the interface that
    /// transmitted this frame. Carries the same id.
    pub fn ack_for(&self, from: InterfaceId, duration: Tick) -> Self {
        Self {
            length: 0,
            transmission_time: duration,
            id: self.id,
            ack: true,
            source_node: self.dest_node,
            dest_node: self.source_node,
            source_interface: Some(from),
            dest_interface: self.source_interface,
        }
    }

    /// Whether this frame is addressed (hop-wise) to `interface`.
    pub fn is_for(&self, interface: InterfaceId) -> bool {
        self.dest_interface == Some(interface)
    }
}
