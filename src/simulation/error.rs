//! Error types raised by the simulation core.
//!
//! Collisions are not errors; they are handled by the MAC backoff. These
//! types cover configuration mistakes and scheduler misuse, which surface at
//! the point of the invalid operation and propagate to the caller of
//! `step`/`run_to`.

use super::types::Tick;

/// Misuse of the discrete-event scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// An event was posted for a time earlier than the current time.
    InThePast { requested: Tick, now: Tick },
    /// The event queue is empty; the simulation has quiesced.
    NoMoreEvents,
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::InThePast { requested, now } => {
                write!(f, "Cannot post event at tick {} (current tick is {})", requested, now)
            }
            SchedulerError::NoMoreEvents => write!(f, "No more events in queue"),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Error raised by network operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A traffic source was asked to produce without any destination.
    NoDestination(String),
    /// A node was asked to produce or send without an attached interface.
    NoInterface(String),
    /// Grid routing could not find a next hop for the destination.
    NoRoute { interface: String, destination: String },
    /// A medium without members was asked for its rightmost/downmost member.
    EmptyMedium(String),
    /// The node is not a traffic source.
    NotASource(String),
    Scheduler(SchedulerError),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::NoDestination(node) => write!(f, "Node {} messages have no destination", node),
            SimError::NoInterface(node) => write!(f, "Node {} has no network interface", node),
            SimError::NoRoute { interface, destination } => {
                write!(f, "Interface {} has no route towards {}", interface, destination)
            }
            SimError::EmptyMedium(medium) => write!(f, "Medium {} is empty", medium),
            SimError::NotASource(node) => write!(f, "Node {} is not a traffic source", node),
            SimError::Scheduler(err) => write!(f, "Scheduler error: {}", err),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Scheduler(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchedulerError> for SimError {
    fn from(err: SchedulerError) -> Self {
        SimError::Scheduler(err)
    }
}

impl SimError {
    /// True when the error only signals that the simulation ran out of events.
    pub fn is_quiescent(&self) -> bool {
        matches!(self, SimError::Scheduler(SchedulerError::NoMoreEvents))
    }
}
