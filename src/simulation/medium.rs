//! Shared broadcast medium.
//!
//! A medium is the set of interfaces that hear a given transmitter. Each
//! interface owns one medium (its transmission range); membership is
//! directional. Members are kept in insertion order so deliveries happen in
//! a reproducible order.

use super::types::InterfaceId;

#[derive(Debug, Clone)]
pub struct BroadcastMedium {
    pub name: String,
    members: Vec<InterfaceId>,
}

impl BroadcastMedium {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: Vec::new() }
    }

    /// Add `interface` unless it is already a member. Returns whether it was added.
    pub fn add_member(&mut self, interface: InterfaceId) -> bool {
        if self.members.contains(&interface) {
            return false;
        }
        self.members.push(interface);
        true
    }

    pub fn members(&self) -> &[InterfaceId] {
        &self.members
    }

    pub fn contains(&self, interface: InterfaceId) -> bool {
        self.members.contains(&interface)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member with the largest `key`. Ties keep the earliest member.
    ///
    /// Used for the grid routing's "rightmost" and "downmost" next hop.
    pub fn extreme_member<F>(&self, mut key: F) -> Option<InterfaceId>
    where
        F: FnMut(InterfaceId) -> f64,
    {
        let mut best: Option<(InterfaceId, f64)> = None;
        for &member in &self.members {
            let value = key(member);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((member, value)),
            }
        }
        best.map(|(member, _)| member)
    }
}
