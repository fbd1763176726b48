//! The pending-event buffer.
//!
//! A plain FIFO across all targets: `post` appends to the tail and never
//! delivers anything synchronously, which is what keeps posting (and signal
//! emission) from ever re-entering the loop.

use std::collections::VecDeque;

use crate::event::Event;

/// An ordered buffer of events awaiting dispatch.
pub(crate) struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Append an event to the tail.
    pub fn post(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Remove and return the head, or `None` if the queue is empty.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Check if any events are pending.
    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::target::TargetTable;

    #[test]
    fn test_fifo_order() {
        let mut table = TargetTable::new();
        let target = table.insert(Box::new(|_: &Event| true));
        let ty = EventType::register();

        let mut queue = EventQueue::new();
        queue.post(Event::new(ty, target, 1u32));
        queue.post(Event::new(ty, target, 2u32));
        queue.post(Event::new(ty, target, 3u32));

        assert_eq!(queue.pending_count(), 3);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop_next())
            .map(|e| *e.payload::<u32>().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_pop_empty() {
        let mut queue = EventQueue::new();
        assert!(queue.pop_next().is_none());
        assert_eq!(queue.pending_count(), 0);
    }
}
