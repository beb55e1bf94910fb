//! Scheduled-task queue owned by the dispatch task. Nothing in here runs on
//! its own: the owner asks for due entries and handles them itself, so timer
//! effects are always serialized with input processing.
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::{
    functor::{FunctorId, NodeId},
    macros::PlaybackId,
};

/// Identifier of a scheduled timer. Ids are never reused.
pub type TimerId = u64;

/// What a timer should wake up when it expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTarget {
    /// A node inside the functor tree rooted at `root`
    Functor { root: FunctorId, node: NodeId },
    /// The next step of a macro playback
    Macro(PlaybackId),
}

/// An expired timer returned by [TimerQueue::pop_due]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    pub id: TimerId,
    pub deadline: Instant,
    pub target: TimerTarget,
}

/// Deadline ordered queue of timers. Timers with equal deadlines fire in the
/// order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(Instant, TimerId), TimerTarget>,
    deadlines: HashMap<TimerId, Instant>,
    next_id: TimerId,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new timer expiring at `deadline`
    pub fn schedule(&mut self, deadline: Instant, target: TimerTarget) -> TimerId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert((deadline, id), target);
        self.deadlines.insert(id, deadline);
        log::trace!("Scheduled timer {id} for {target:?}");
        id
    }

    /// Cancel the given timer. Returns false if the timer already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(deadline) = self.deadlines.remove(&id) else {
            return false;
        };
        self.entries.remove(&(deadline, id));
        log::trace!("Cancelled timer {id}");
        true
    }

    /// Returns true if the given timer is still pending
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer whose deadline is at or before
    /// `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<DueTimer> {
        let (&(deadline, id), _) = self.entries.iter().next()?;
        if deadline > now {
            return None;
        }
        let target = self.entries.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some(DueTimer {
            id,
            deadline,
            target,
        })
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.deadlines.clear();
    }
}

/// Longest delay a timer can be scheduled with
const MAX_DELAY: Duration = Duration::from_secs(60 * 60 * 24);

/// Convert a duration in seconds from a profile into a [Duration]. Negative
/// and NaN values become zero.
pub fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value)
        .unwrap_or(MAX_DELAY)
        .min(MAX_DELAY)
}
