use std::collections::VecDeque;
use crate::events::stream::PriceUpdate;
use crate::types::timestamp::Timestamp;

/// Most recent updates fanned out for one hotel, kept for gap-filling replay.
#[derive(Debug)]
pub struct UpdateBacklog {
    updates: VecDeque<PriceUpdate>,
    capacity: usize,
    /// Every sequence up to and including this one is no longer held.
    evicted_through: u64,
}

impl UpdateBacklog {
    pub fn new(capacity: usize) -> Self {
        UpdateBacklog {
            updates: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            evicted_through: 0,
        }
    }

    pub fn push(&mut self, update: PriceUpdate) {
        if self.updates.is_empty() && self.evicted_through == 0 {
            // The backlog may start after sequences that were never published here.
            self.evicted_through = update.sequence.saturating_sub(1);
        }
        if self.updates.len() == self.capacity {
            if let Some(oldest) = self.updates.pop_front() {
                self.evicted_through = oldest.sequence;
            }
        }
        self.updates.push_back(update);
    }

    /// Updates with a sequence above `cursor`, or `None` when some of them
    /// have already been evicted.
    pub fn since(&self, cursor: u64) -> Option<Vec<PriceUpdate>> {
        if cursor < self.evicted_through {
            return None;
        }
        Some(
            self.updates
                .iter()
                .filter(|u| u.sequence > cursor)
                .cloned()
                .collect(),
        )
    }

    /// Observation time of the most recent update held.
    pub fn newest_timestamp(&self) -> Option<Timestamp> {
        self.updates.iter().map(|u| u.timestamp).max()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
