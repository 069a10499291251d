//! Discrete-event simulator of a CSMA/CA wireless network.
//!
//! - `simulation`: scheduler, MAC state machine, medium, nodes and the network arena
//! - `common`: scene file format
//! - `experiment`: sweep configuration and orchestration

pub mod common;
pub mod experiment;
pub mod simulation;
