//! Event types and the process-wide event-type registry.
//!
//! Every [`Event`] carries a type tag drawn from a monotonically increasing
//! allocator, so user-defined event kinds never collide with built-in kinds
//! such as timer expiry. User kinds start at [`EventType::USER_BASE`] and are
//! handed out by [`EventType::register`].

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::target::TargetId;
use crate::timer::TimerId;

/// Counter for allocating user-defined event types.
static NEXT_USER_TYPE: AtomicU32 = AtomicU32::new(EventType::USER_BASE);

/// A type tag classifying an [`Event`].
///
/// Built-in kinds occupy the range below [`EventType::USER_BASE`]; user kinds
/// are allocated at runtime via [`EventType::register`] and are unique for
/// the lifetime of the process.
///
/// # Example
///
/// ```
/// use eventide_core::EventType;
///
/// let kind_a = EventType::register();
/// let kind_b = EventType::register();
/// assert_ne!(kind_a, kind_b);
/// assert_ne!(kind_a, EventType::TIMER);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventType(u32);

impl EventType {
    /// A timer has expired. The payload is the [`TimerId`] that fired.
    pub const TIMER: EventType = EventType(0);

    /// The first value available for user-defined event kinds.
    pub const USER_BASE: u32 = 1000;

    /// Allocate a new user-defined event type.
    ///
    /// Each call returns a distinct type that never collides with built-in
    /// kinds or with other registered kinds.
    pub fn register() -> EventType {
        let raw = NEXT_USER_TYPE.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "eventide_core::event", raw, "registered event type");
        EventType(raw)
    }

    /// The raw numeric value of this type tag.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Reconstruct a type tag from its raw value.
    ///
    /// Useful for interop with systems that persist the numeric id. This
    /// does not check that the value was ever allocated; posting an event
    /// with an unallocated tag is rejected at post time.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        EventType(raw)
    }

    /// Whether this type tag is a built-in kind or was handed out by
    /// [`EventType::register`].
    pub(crate) fn is_registered(self) -> bool {
        self == Self::TIMER
            || (Self::USER_BASE..NEXT_USER_TYPE.load(Ordering::Relaxed)).contains(&self.0)
    }
}

/// An immutable, typed, addressed unit of work flowing through the loop.
///
/// Events are created by a poster, consumed exactly once by the event loop,
/// and discarded after delivery. The payload is opaque to the dispatch
/// machinery; targets downcast it with [`Event::payload`].
pub struct Event {
    event_type: EventType,
    payload: Box<dyn Any + Send>,
    target: TargetId,
}

impl Event {
    /// Create an event addressed to `target`.
    pub fn new<P>(event_type: EventType, target: TargetId, payload: P) -> Self
    where
        P: Any + Send,
    {
        Self {
            event_type,
            payload: Box::new(payload),
            target,
        }
    }

    /// Create a timer-expiry event for `id`, addressed to the timer's target.
    pub(crate) fn timer_expiry(id: TimerId, target: TargetId) -> Self {
        Self::new(EventType::TIMER, target, id)
    }

    /// The type tag of this event.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The target this event is addressed to.
    #[inline]
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Downcast the payload to a concrete type.
    ///
    /// Returns `None` if the payload is of a different type.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }

    /// For timer-expiry events, the timer that fired.
    pub fn timer_id(&self) -> Option<TimerId> {
        if self.event_type == EventType::TIMER {
            self.payload::<TimerId>().copied()
        } else {
            None
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
