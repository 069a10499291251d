//! Discrete-event scheduling kernel.
//!
//! Pending events are kept in a `BTreeMap` ordered by `(time, sequence)`.
//! The sequence number is a post counter, so events posted for the same tick
//! fire in the order they were posted. A side index from `EventId` to its
//! time makes `drop` O(log n) and idempotent.

use std::collections::{BTreeMap, HashMap};

use super::error::SchedulerError;
use super::types::Tick;

/// Handle to a posted event, returned by [`Scheduler::post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Ordering key: time first, then FIFO by post sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    time: Tick,
    sequence: u64,
}

/// Time-ordered queue of pending events of type `E`.
#[derive(Debug)]
pub struct Scheduler<E> {
    now: Tick,
    next_sequence: u64,
    queue: BTreeMap<EventKey, E>,
    pending: HashMap<EventId, Tick>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_sequence: 0,
            queue: BTreeMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Schedule `event` to fire at `time`.
    ///
    /// # Returns
    ///
    /// The handle needed to drop the event, or `InThePast` if `time` is
    /// earlier than the current time.
    pub fn post(&mut self, time: Tick, event: E) -> Result<EventId, SchedulerError> {
        if time < self.now {
            return Err(SchedulerError::InThePast { requested: time, now: self.now });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = EventId(sequence);
        self.queue.insert(EventKey { time, sequence }, event);
        self.pending.insert(id, time);
        Ok(id)
    }

    /// Schedule `event` to fire `delay` ticks from now.
    pub fn post_after(&mut self, delay: Tick, event: E) -> Result<EventId, SchedulerError> {
        self.post(self.now.saturating_add(delay), event)
    }

    /// Cancel a pending event.
    ///
    /// Dropping an event that already fired, was already dropped, or belongs
    /// to a previous run is a no-op. Returns whether something was removed.
    pub fn drop(&mut self, id: EventId) -> bool {
        match self.pending.remove(&id) {
            Some(time) => self.queue.remove(&EventKey { time, sequence: id.0 }).is_some(),
            None => false,
        }
    }

    /// Whether `id` is still waiting to fire.
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Time of the earliest pending event.
    pub fn next_event_time(&self) -> Result<Tick, SchedulerError> {
        self.queue.keys().next().map(|key| key.time).ok_or(SchedulerError::NoMoreEvents)
    }

    /// Move the clock forward. The clock never goes backwards.
    pub fn advance_to(&mut self, time: Tick) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Remove and return the earliest event if it is due at the current time.
    pub fn pop_due(&mut self) -> Option<(EventId, E)> {
        let key = *self.queue.keys().next()?;
        if key.time > self.now {
            return None;
        }
        let event = self.queue.remove(&key)?;
        let id = EventId(key.sequence);
        self.pending.remove(&id);
        Some((id, event))
    }

    /// Forget every pending event and rewind the clock for a fresh run.
    ///
    /// The sequence counter keeps increasing so that handles from the
    /// previous run can never alias new events.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.pending.clear();
        self.now = 0;
    }
}
