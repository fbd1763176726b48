//! Timer registry: one-shot and repeating timers addressed to targets.
//!
//! Each loop iteration asks the registry for due timers; every due timer
//! enqueues exactly one timer-expiry event addressed to its target. Repeating
//! timers rearm by advancing the old deadline in whole multiples of the
//! interval, so load never accumulates drift and missed ticks are coalesced
//! into a single fired event.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::TimerError;
use crate::event::Event;
use crate::target::TargetId;

new_key_type! {
    /// A unique identifier for an armed timer.
    pub struct TimerId;
}

/// The firing mode of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the interval elapses.
    ///
    /// A zero interval is valid and means "fire as soon as the loop is
    /// idle" -- the canonical way to defer startup work into the loop.
    OneShot,
    /// Fires repeatedly at the interval.
    Repeating,
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData {
    /// When this timer should next fire.
    next_deadline: Instant,
    /// The interval between fires.
    interval: Duration,
    /// The firing mode.
    kind: TimerKind,
    /// The target addressed by expiry events.
    target: TargetId,
    /// Arm order, used to break ties among simultaneously-due timers.
    seq: u64,
}

/// An entry in the deadline queue (min-heap by deadline, then arm order).
#[derive(Debug, Clone, Copy)]
struct DeadlineEntry {
    id: TimerId,
    deadline: Instant,
    seq: u64,
}

impl PartialEq for DeadlineEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for DeadlineEntry {}

impl PartialOrd for DeadlineEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeadlineEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap behavior (BinaryHeap is a max-heap):
        // earliest deadline pops first, arm order breaks ties.
        other
            .deadline
            .cmp(&self.deadline)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Tracks all armed timers and computes the next wake deadline.
pub(crate) struct TimerRegistry {
    /// All armed timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Pending deadlines (min-heap).
    queue: BinaryHeap<DeadlineEntry>,
    /// Arm-order counter.
    next_seq: u64,
}

impl TimerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Arm a timer whose expiry events are addressed to `target`.
    ///
    /// The first deadline is `now + interval`. Repeating timers reject a
    /// zero interval.
    pub fn arm(
        &mut self,
        now: Instant,
        interval: Duration,
        kind: TimerKind,
        target: TargetId,
    ) -> Result<TimerId, TimerError> {
        if kind == TimerKind::Repeating && interval.is_zero() {
            return Err(TimerError::ZeroIntervalRepeating);
        }

        let next_deadline = now + interval;
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = self.timers.insert(TimerData {
            next_deadline,
            interval,
            kind,
            target,
            seq,
        });
        self.queue.push(DeadlineEntry {
            id,
            deadline: next_deadline,
            seq,
        });

        tracing::trace!(target: "eventide_core::timer", ?id, ?interval, ?kind, "armed timer");
        Ok(id)
    }

    /// Cancel a timer. Returns `true` if it was armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        // The matching heap entry is discarded lazily.
        let cancelled = self.timers.remove(id).is_some();
        if cancelled {
            tracing::trace!(target: "eventide_core::timer", ?id, "cancelled timer");
        }
        cancelled
    }

    /// Check if a timer is currently armed.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration until the next deadline, if any timer is armed.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        // Discard stale entries (cancelled or rearmed timers) from the front.
        while let Some(entry) = self.queue.peek() {
            let live = self
                .timers
                .get(entry.id)
                .is_some_and(|t| t.next_deadline == entry.deadline);
            if live {
                break;
            }
            self.queue.pop();
        }

        self.queue
            .peek()
            .map(|entry| entry.deadline.saturating_duration_since(now))
    }

    /// Collect one expiry event for every timer due at `now`.
    ///
    /// One-shot timers are removed after firing. Repeating timers rearm by
    /// advancing the deadline in whole multiples of the interval until it is
    /// in the future: consumers depend on "it fired", not on how many
    /// intervals elapsed, so catch-up ticks collapse into this single event.
    pub fn process_due(&mut self, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.deadline > now {
                break;
            }

            let entry = self.queue.pop().expect("peeked entry");
            let id = entry.id;

            let Some(timer) = self.timers.get_mut(id) else {
                // Cancelled; stale heap entry.
                continue;
            };
            if timer.next_deadline != entry.deadline {
                // Rearmed; this entry is superseded.
                continue;
            }

            tracing::trace!(target: "eventide_core::timer", ?id, "timer fired");
            events.push(Event::timer_expiry(id, timer.target));

            match timer.kind {
                TimerKind::OneShot => {
                    self.timers.remove(id);
                }
                TimerKind::Repeating => {
                    let mut next = timer.next_deadline + timer.interval;
                    while next <= now {
                        next += timer.interval;
                    }
                    timer.next_deadline = next;
                    self.queue.push(DeadlineEntry {
                        id,
                        deadline: next,
                        seq: timer.seq,
                    });
                }
            }
        }

        events
    }

    /// Get the number of armed timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
