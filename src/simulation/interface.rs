//! Per-interface MAC state.
//!
//! This module only holds the data of a wireless interface. The transitions
//! that act on it live in [`mac`](super::mac), because they need access to
//! the scheduler, the medium and the other interfaces through the network
//! arena.

use std::collections::VecDeque;

use super::message::Message;
use super::scheduler::EventId;
use super::types::{InterfaceId, MediumId, NodeId, Status, Tick};

/// Timers a MAC interface can have pending. Each one has its own slot in
/// [`MacTimers`], so at most one event of each kind is ever scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacTimer {
    DifsElapsed,
    BackoffElapsed,
    TransmissionEnded,
    AckTimeout,
    ReceptionEnded,
    SifsElapsed,
    AckTransmissionEnded,
}

#[derive(Debug, Default, Clone)]
pub struct MacTimers {
    pub difs: Option<EventId>,
    pub backoff: Option<EventId>,
    pub transmission: Option<EventId>,
    pub ack_timeout: Option<EventId>,
    pub reception: Option<EventId>,
    pub sifs: Option<EventId>,
    pub ack_transmission: Option<EventId>,
}

impl MacTimers {
    pub fn slot(&mut self, timer: MacTimer) -> &mut Option<EventId> {
        match timer {
            MacTimer::DifsElapsed => &mut self.difs,
            MacTimer::BackoffElapsed => &mut self.backoff,
            MacTimer::TransmissionEnded => &mut self.transmission,
            MacTimer::AckTimeout => &mut self.ack_timeout,
            MacTimer::ReceptionEnded => &mut self.reception,
            MacTimer::SifsElapsed => &mut self.sifs,
            MacTimer::AckTransmissionEnded => &mut self.ack_transmission,
        }
    }
}

/// The frame an interface is currently listening to.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub message: Message,
    pub ends_at: Tick,
}

/// A wireless network interface with CSMA/CA state.
#[derive(Debug, Clone)]
pub struct WifiInterface {
    pub id: InterfaceId,
    pub name: String,
    pub node: NodeId,
    /// Medium this interface transmits on.
    pub medium: MediumId,
    pub radius: f64,
    pub status: Status,
    pub outgoing: VecDeque<Message>,
    pub acks: VecDeque<Message>,
    pub collision: bool,
    pub contention_window: u32,
    pub incoming: Option<Incoming>,
    /// Backoff slots still to count down.
    pub backoff_remaining: Tick,
    /// When the running countdown started (or will start after a DIFS).
    pub backoff_started: Tick,
    /// A countdown interrupted by an ACK cycle, resumed once it completes.
    pub backoff_paused: bool,
    pub waiting_for_ack: bool,
    pub retransmit_pending: bool,
    /// Frames lost to collisions at this receiver.
    pub corrupted: u64,
    pub timers: MacTimers,
}

impl WifiInterface {
    pub fn new(id: InterfaceId, name: impl Into<String>, node: NodeId, medium: MediumId, radius: f64, cw_min: u32) -> Self {
        Self {
            id,
            name: name.into(),
            node,
            medium,
            radius,
            status: Status::Idle,
            outgoing: VecDeque::new(),
            acks: VecDeque::new(),
            collision: false,
            contention_window: cw_min,
            incoming: None,
            backoff_remaining: 0,
            backoff_started: 0,
            backoff_paused: false,
            waiting_for_ack: false,
            retransmit_pending: false,
            corrupted: 0,
            timers: MacTimers::default(),
        }
    }

    /// Return to the power-on state for a new run.
    pub fn reset(&mut self, cw_min: u32) {
        self.status = Status::Idle;
        self.outgoing.clear();
        self.acks.clear();
        self.collision = false;
        self.contention_window = cw_min;
        self.incoming = None;
        self.backoff_remaining = 0;
        self.backoff_started = 0;
        self.backoff_paused = false;
        self.waiting_for_ack = false;
        self.retransmit_pending = false;
        self.corrupted = 0;
        self.timers = MacTimers::default();
    }

    pub fn is_receiving(&self) -> bool {
        self.incoming.is_some()
    }

    /// Id of the frame at the head of the outgoing queue.
    pub fn head_id(&self) -> Option<u32> {
        self.outgoing.front().map(|m| m.id)
    }
}
