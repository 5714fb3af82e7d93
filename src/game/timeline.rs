//! Virtual-time scheduler for playback and feedback timers
//!
//! Timers are plain records ordered by `(at_ms, id)`, so two actions due at
//! the same instant fire in the order they were scheduled.

use std::collections::BTreeMap;

use serde::Serialize;

use super::tile::Tile;

/// Handle to a scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub u64);

/// Work to perform when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerAction {
    /// Light playback slot `slot`
    Highlight { slot: usize, tile: Tile },
    /// End of the lit part of slot `slot`
    Unhighlight { slot: usize, tile: Tile },
    /// Playback finished, open the input phase
    EnableInput,
    /// Revert a click feedback highlight
    ClearFeedback { tile: Tile },
}

/// A fired (or pending) timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledAction {
    pub id: TimerId,
    pub at_ms: u64,
    pub action: TimerAction,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    now_ms: u64,
    queue: BTreeMap<(u64, TimerId), TimerAction>,
    next_id: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `action` at `delay_ms` after the current time
    pub fn schedule(&mut self, delay_ms: u64, action: TimerAction) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((self.now_ms.saturating_add(delay_ms), id), action);
        id
    }

    /// Remove a pending timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.queue.keys().find(|(_, k)| *k == id).copied();
        key.and_then(|k| self.queue.remove(&k)).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }

    /// Pop the earliest action due at or before `until_ms`, moving the clock to its time
    pub fn pop_due(&mut self, until_ms: u64) -> Option<ScheduledAction> {
        let (&(at_ms, id), _) = self.queue.first_key_value()?;
        if at_ms > until_ms {
            return None;
        }
        let action = self.queue.remove(&(at_ms, id))?;
        self.now_ms = self.now_ms.max(at_ms);
        Some(ScheduledAction { id, at_ms, action })
    }

    /// Move the clock forward (never backward) once all due actions are drained
    pub fn settle(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending actions in firing order
    pub fn pending(&self) -> impl Iterator<Item = ScheduledAction> + '_ {
        self.queue
            .iter()
            .map(|(&(at_ms, id), &action)| ScheduledAction { id, at_ms, action })
    }

    /// Time of the next pending action
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(at, _)| *at)
    }
}
