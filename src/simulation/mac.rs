//! CSMA/CA medium access control.
//!
//! Transitions of the per-interface state machine, implemented on
//! [`Network`] because each step touches the scheduler, the medium and the
//! receiving interfaces.
//!
//! ## Timing
//!
//! - `DIFS = SIFS + 2 * slot` of idle medium before a first transmission attempt
//! - Backoff of `uniform[1, cw]` ticks after a busy medium or a lost ACK
//! - `ACK timeout = SIFS + ACK duration + slot` after the end of a data frame
//! - The contention window doubles on every ACK timeout (capped at `cw_max`)
//!   and falls back to `cw_min` on every matching ACK
//!
//! A backoff countdown pauses while the medium is busy and resumes after a
//! DIFS of idle medium, so an ACK sent after SIFS always wins the channel.
//! A clean frame heard during the pause is still acknowledged, delivered or
//! forwarded; the countdown then resumes once the ACK has gone out.

use rand::Rng;
use serde::Deserialize;

use super::error::SimError;
use super::interface::{Incoming, MacTimer};
use super::message::Message;
use super::network::{Network, SimEvent};
use super::stats;
use super::types::{InterfaceId, NodeId, Status, Tick};

/// MAC timing parameters, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MacConfig {
    pub slot: Tick,
    pub sifs: Tick,
    pub ack_duration: Tick,
    pub cw_min: u32,
    pub cw_max: u32,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            slot: 9,
            sifs: 10,
            ack_duration: 10,
            cw_min: 16,
            cw_max: 1024,
        }
    }
}

impl MacConfig {
    pub fn difs(&self) -> Tick {
        self.sifs + 2 * self.slot
    }

    pub fn ack_timeout(&self) -> Tick {
        self.sifs + self.ack_duration + self.slot
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cw_min == 0 {
            return Err("cw-min must be at least 1".to_string());
        }
        if self.cw_max < self.cw_min {
            return Err(format!("cw-max ({}) must not be below cw-min ({})", self.cw_max, self.cw_min));
        }
        if self.ack_duration == 0 {
            return Err("ack-duration must be positive".to_string());
        }
        Ok(())
    }
}

/// Next hop chosen by the grid routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingOutcome {
    Found(InterfaceId),
    NoRoute,
}

impl Network {
    /// Pick the next hop on `iface`'s medium toward `destination`.
    ///
    /// A destination that is a direct member of the medium is reached
    /// directly. Otherwise a destination on the same row goes to the rightmost
    /// member and one on the same column to the downmost member.
    ///
    /// # Returns
    ///
    /// `EmptyMedium` if the medium has no members, otherwise the routing outcome.
    pub fn route(&self, iface: InterfaceId, destination: NodeId) -> Result<RoutingOutcome, SimError> {
        let interface = &self.interfaces[iface.0];
        let medium = &self.media[interface.medium.0];
        if medium.is_empty() {
            return Err(SimError::EmptyMedium(medium.name.clone()));
        }

        let target = &self.nodes[destination.0];
        if let Some(direct) = target.interface.filter(|d| medium.contains(*d)) {
            return Ok(RoutingOutcome::Found(direct));
        }

        let here = self.nodes[interface.node.0].position;
        let next = if here.same_row(&target.position) {
            medium.extreme_member(|m| self.position_of(m).x)
        } else if here.same_column(&target.position) {
            medium.extreme_member(|m| self.position_of(m).y)
        } else {
            None
        };
        Ok(next.map_or(RoutingOutcome::NoRoute, RoutingOutcome::Found))
    }

    /// Queue `message` for transmission on `iface`.
    ///
    /// Stamps the hop addressing, then starts a send attempt if the
    /// interface is idle. Otherwise the frame waits in the outgoing queue.
    pub fn send(&mut self, iface: InterfaceId, mut message: Message) -> Result<(), SimError> {
        let next_hop = match self.route(iface, message.dest_node)? {
            RoutingOutcome::Found(next_hop) => next_hop,
            RoutingOutcome::NoRoute => {
                let interface = self.interfaces[iface.0].name.clone();
                let destination = self.nodes[message.dest_node.0].name.clone();
                log::debug!("{} cannot route frame {} toward {}", interface, message.id, destination);
                return Err(SimError::NoRoute { interface, destination });
            }
        };
        message.source_interface = Some(iface);
        message.dest_interface = Some(next_hop);
        self.interfaces[iface.0].outgoing.push_back(message);

        if self.interfaces[iface.0].status == Status::Idle {
            self.try_send(iface)?;
        }
        Ok(())
    }

    /// Deliver a frame that just started on the medium to `iface`.
    pub fn receive(&mut self, iface: InterfaceId, message: Message) -> Result<(), SimError> {
        let status = self.interfaces[iface.0].status;
        if status.is_deaf() {
            self.stats.increment(stats::MISSED);
            log::trace!("{} missed frame {} while {}", self.interfaces[iface.0].name, message.id, status);
            return Ok(());
        }
        match status {
            Status::Idle | Status::WaitingForAck => {
                self.set_status(iface, Status::ReceivingMessage);
                self.listen(iface, message)
            }
            Status::ReceivingMessage => self.listen(iface, message),
            Status::WaitingForDifs => {
                self.stats.increment(stats::DEFERRALS);
                self.interfaces[iface.0].collision = true;
                self.listen(iface, message)
            }
            Status::WaitingForBackoff => {
                self.pause_backoff(iface);
                self.listen(iface, message)
            }
            // Deaf, counted above.
            Status::SendingMessage | Status::SendingAck | Status::WaitingForSifs => Ok(()),
        }
    }

    /// Dispatch an expired MAC timer.
    pub(super) fn on_timer(&mut self, iface: InterfaceId, timer: MacTimer) -> Result<(), SimError> {
        match timer {
            MacTimer::DifsElapsed => self.difs_elapsed(iface),
            MacTimer::BackoffElapsed => self.transmit_head(iface),
            MacTimer::TransmissionEnded => self.transmission_ended(iface),
            MacTimer::AckTimeout => self.ack_timeout(iface),
            MacTimer::ReceptionEnded => self.reception_ended(iface),
            MacTimer::SifsElapsed => self.sifs_elapsed(iface),
            MacTimer::AckTransmissionEnded => self.resume(iface),
        }
    }

    fn try_send(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        if self.interfaces[iface.0].outgoing.is_empty() {
            self.set_status(iface, Status::Idle);
            return Ok(());
        }
        self.set_status(iface, Status::WaitingForDifs);
        self.interfaces[iface.0].collision = false;
        let at = self.now() + self.config.difs();
        self.arm(iface, MacTimer::DifsElapsed, at)
    }

    fn difs_elapsed(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let interface = &self.interfaces[iface.0];
        if interface.collision || interface.is_receiving() {
            self.start_backoff(iface)
        } else {
            self.transmit_head(iface)
        }
    }

    /// Draw a fresh countdown. While a reception is in progress the
    /// countdown stays paused until the medium has been idle for a DIFS.
    fn start_backoff(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        self.set_status(iface, Status::WaitingForBackoff);
        let now = self.now();
        let cw = self.interfaces[iface.0].contention_window.max(1);
        let remaining = self.rng.gen_range(1..=cw) as Tick;

        let interface = &mut self.interfaces[iface.0];
        interface.backoff_remaining = remaining;
        if interface.is_receiving() {
            return Ok(());
        }
        interface.backoff_started = now;
        self.arm(iface, MacTimer::BackoffElapsed, now + remaining)
    }

    fn pause_backoff(&mut self, iface: InterfaceId) {
        if !self.disarm(iface, MacTimer::BackoffElapsed) {
            return;
        }
        let now = self.now();
        let interface = &mut self.interfaces[iface.0];
        let elapsed = now.saturating_sub(interface.backoff_started);
        interface.backoff_remaining = interface.backoff_remaining.saturating_sub(elapsed);
    }

    /// Continue a paused countdown with the slots it had left, from `start`.
    fn rearm_backoff(&mut self, iface: InterfaceId, start: Tick) -> Result<(), SimError> {
        let interface = &mut self.interfaces[iface.0];
        interface.backoff_started = start;
        let at = start + interface.backoff_remaining;
        self.arm(iface, MacTimer::BackoffElapsed, at)
    }

    fn transmit_head(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let Some(message) = self.interfaces[iface.0].outgoing.front().cloned() else {
            return self.try_send(iface);
        };
        self.set_status(iface, Status::SendingMessage);
        self.interfaces[iface.0].collision = false;
        let at = self.now() + message.transmission_time;
        self.arm(iface, MacTimer::TransmissionEnded, at)?;
        self.stats.increment(stats::FRAMES_SENT);
        self.broadcast(iface, message)
    }

    fn transmission_ended(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        self.set_status(iface, Status::WaitingForAck);
        self.interfaces[iface.0].waiting_for_ack = true;
        let at = self.now() + self.config.ack_timeout();
        self.arm(iface, MacTimer::AckTimeout, at)
    }

    fn ack_timeout(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let cw_max = self.config.cw_max;
        let interface = &mut self.interfaces[iface.0];
        interface.waiting_for_ack = false;
        interface.contention_window = interface.contention_window.saturating_mul(2).min(cw_max);
        self.stats.increment(stats::ACK_TIMEOUTS);
        log::debug!(
            "{} ACK timeout for frame {:?}, contention window now {}",
            interface.name,
            interface.head_id(),
            interface.contention_window
        );

        if interface.status == Status::WaitingForAck {
            self.start_backoff(iface)
        } else {
            interface.retransmit_pending = true;
            Ok(())
        }
    }

    /// Track an incoming frame. Overlapping frames collide and the receiver
    /// stays busy until the longest of them ends.
    fn listen(&mut self, iface: InterfaceId, message: Message) -> Result<(), SimError> {
        let ends_at = self.now() + message.transmission_time;
        let interface = &mut self.interfaces[iface.0];
        let rearm = match &interface.incoming {
            Some(current) => {
                interface.collision = true;
                interface.corrupted += 1;
                self.stats.increment(stats::COLLISIONS);
                log::trace!("{} collision on frame {}", interface.name, message.id);
                ends_at > current.ends_at
            }
            None => true,
        };
        if rearm {
            interface.incoming = Some(Incoming { message, ends_at });
            self.arm(iface, MacTimer::ReceptionEnded, ends_at)?;
        }
        Ok(())
    }

    fn reception_ended(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let now = self.now();
        let difs = self.config.difs();
        let interface = &mut self.interfaces[iface.0];
        let incoming = interface.incoming.take();
        let status = interface.status;

        match status {
            Status::ReceivingMessage => {
                if interface.collision {
                    interface.collision = false;
                } else if let Some(Incoming { message, .. }) = incoming {
                    self.accept(iface, message)?;
                }
                self.resume(iface)
            }
            Status::WaitingForBackoff => {
                if interface.collision {
                    interface.collision = false;
                } else if let Some(Incoming { message, .. }) = incoming {
                    self.accept(iface, message)?;
                    let interface = &mut self.interfaces[iface.0];
                    if !interface.acks.is_empty() {
                        // The ACK goes first; the countdown picks up again afterwards.
                        interface.backoff_paused = true;
                        return self.resume(iface);
                    }
                }
                self.rearm_backoff(iface, now + difs)
            }
            // WaitingForDifs keeps the collision flag so the attempt backs off.
            _ => Ok(()),
        }
    }

    /// Handle a frame received without collision.
    fn accept(&mut self, iface: InterfaceId, message: Message) -> Result<(), SimError> {
        if !message.is_for(iface) {
            return Ok(());
        }

        if message.ack {
            let interface = &mut self.interfaces[iface.0];
            if interface.waiting_for_ack && interface.head_id() == Some(message.id) {
                interface.outgoing.pop_front();
                interface.waiting_for_ack = false;
                interface.contention_window = self.config.cw_min;
                log::trace!("{} acknowledged frame {}", interface.name, message.id);
                self.disarm(iface, MacTimer::AckTimeout);
            }
            return Ok(());
        }

        let ack = message.ack_for(iface, self.config.ack_duration);
        self.interfaces[iface.0].acks.push_back(ack);

        let node = self.interfaces[iface.0].node;
        if message.dest_node == node {
            self.put(node, message);
        } else {
            self.stats.increment(stats::FORWARDED);
            log::debug!("{} forwards frame {} toward {}", self.interfaces[iface.0].name, message.id, self.nodes[message.dest_node.0].name);
            self.scheduler.post_after(0, SimEvent::Forward(iface, message))?;
        }
        Ok(())
    }

    /// Pick the next activity once the medium is free again.
    fn resume(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let interface = &mut self.interfaces[iface.0];
        if !interface.acks.is_empty() {
            self.set_status(iface, Status::WaitingForSifs);
            let at = self.now() + self.config.sifs;
            return self.arm(iface, MacTimer::SifsElapsed, at);
        }
        if interface.waiting_for_ack {
            self.set_status(iface, Status::WaitingForAck);
            return Ok(());
        }
        if interface.backoff_paused {
            interface.backoff_paused = false;
            self.set_status(iface, Status::WaitingForBackoff);
            let at = self.now() + self.config.difs();
            return self.rearm_backoff(iface, at);
        }
        if interface.retransmit_pending {
            interface.retransmit_pending = false;
            return self.start_backoff(iface);
        }
        self.try_send(iface)
    }

    fn sifs_elapsed(&mut self, iface: InterfaceId) -> Result<(), SimError> {
        let Some(ack) = self.interfaces[iface.0].acks.pop_front() else {
            return self.resume(iface);
        };
        self.set_status(iface, Status::SendingAck);
        let at = self.now() + ack.transmission_time;
        self.arm(iface, MacTimer::AckTransmissionEnded, at)?;
        self.stats.increment(stats::ACKS_SENT);
        self.broadcast(iface, ack)
    }

    /// Put `message` on `iface`'s medium. Every member hears it at once,
    /// in membership order.
    pub fn broadcast(&mut self, iface: InterfaceId, message: Message) -> Result<(), SimError> {
        let medium = self.interfaces[iface.0].medium;
        let members = self.media[medium.0].members().to_vec();
        for member in members {
            self.receive(member, message.clone())?;
        }
        Ok(())
    }

    /// Schedule `timer` for `iface`, replacing any pending instance.
    fn arm(&mut self, iface: InterfaceId, timer: MacTimer, at: Tick) -> Result<(), SimError> {
        self.disarm(iface, timer);
        let id = self.scheduler.post(at, SimEvent::Mac(iface, timer))?;
        *self.interfaces[iface.0].timers.slot(timer) = Some(id);
        Ok(())
    }

    /// Cancel `timer` for `iface`. Returns whether one was pending.
    fn disarm(&mut self, iface: InterfaceId, timer: MacTimer) -> bool {
        match self.interfaces[iface.0].timers.slot(timer).take() {
            Some(id) => self.scheduler.drop(id),
            None => false,
        }
    }

    fn set_status(&mut self, iface: InterfaceId, status: Status) {
        let now = self.now();
        let interface = &mut self.interfaces[iface.0];
        if interface.status == status {
            return;
        }
        log::trace!("t={} {} {} -> {}", now, interface.name, interface.status, status);
        interface.status = status;
        if let Some(trace) = self.trace.as_mut() {
            trace.record(now, &interface.name, status);
        }
    }
}
