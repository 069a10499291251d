//! Network simulation core module.
//!
//! This module provides the discrete-event simulation of a shared-medium
//! wireless network using CSMA/CA. It integrates:
//! - A deterministic event scheduler with FIFO tie-break
//! - Broadcast media with collision detection at the receivers
//! - The per-interface MAC state machine (DIFS, backoff, SIFS, ACK)
//! - Traffic sources and sinks
//!
//! ## Module Organization
//!
//! - `types`: Core value types (time, handles, positions, MAC status)
//! - `scheduler`: Time-ordered event queue
//! - `variate`: Random variates for inter-arrival times
//! - `message`: Data frames and ACKs
//! - `medium`, `interface`, `node`: Entity state
//! - `network`: Entity arena, event loop and run bracketing
//! - `mac`: CSMA/CA transitions and grid routing
//! - `trace`, `stats`: Run output

pub mod error;
pub mod geometry;
pub mod interface;
pub mod mac;
pub mod medium;
pub mod message;
pub mod network;
pub mod node;
pub mod scheduler;
pub mod stats;
pub mod trace;
pub mod types;
pub mod variate;

#[cfg(test)]
mod scenarios;

pub use error::{SchedulerError, SimError};
pub use mac::{MacConfig, RoutingOutcome};
pub use network::Network;
pub use types::{InterfaceId, MediumId, NodeId, Point, Status, Tick};
