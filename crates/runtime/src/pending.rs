//! Tracking of in-flight asynchronous requests.
//!
//! Each key (for example a building id) has at most one current request. Starting
//! a new request, cancelling, or completing bumps the key's generation, so any
//! ticket issued earlier resolves as stale and its result is discarded instead of
//! clobbering newer state.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket<K> {
    pub key: K,
    pub generation: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The ticket was current; the caller should apply the result.
    Current,
    /// The ticket was superseded, cancelled, or already completed.
    Stale,
}

#[derive(Debug)]
pub struct PendingTracker<K> {
    next_generation: u64,
    in_flight: BTreeMap<K, u64>,
}

impl<K> Default for PendingTracker<K> {
    fn default() -> Self {
        Self {
            next_generation: 1,
            in_flight: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> PendingTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `key`, superseding any earlier one.
    pub fn begin(&mut self, key: K) -> Ticket<K> {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.in_flight.insert(key.clone(), generation);
        Ticket { key, generation }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns `true` if a request for `key` was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.in_flight.remove(key).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.in_flight.clear();
    }

    /// Consume `ticket`. Only the most recent ticket for its key resolves as current.
    pub fn complete(&mut self, ticket: &Ticket<K>) -> Resolution {
        match self.in_flight.get(&ticket.key) {
            Some(generation) if *generation == ticket.generation => {
                self.in_flight.remove(&ticket.key);
                Resolution::Current
            }
            _ => Resolution::Stale,
        }
    }
}
