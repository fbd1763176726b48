//! Addressable event targets.
//!
//! A target is any entity capable of handling events. Targets are registered
//! with the loop and addressed by [`TargetId`], a generation-checked arena
//! key: once a target is removed, stale ids simply fail lookup, so the loop
//! tolerates a target disappearing between posting and delivery.
//!
//! # Key Types
//!
//! - [`EventHandler`] - Capability trait implemented by targets
//! - [`TargetId`] - Stable identity for an addressable target
//! - [`DefaultHandler`] - A handler that declines every event

use slotmap::{SlotMap, new_key_type};

use crate::event::Event;

new_key_type! {
    /// A stable identity for an addressable event target.
    ///
    /// Remains valid until the target is removed; after removal, delivery
    /// to the stale id is silently dropped.
    pub struct TargetId;
}

/// The error type a handler may fail with.
///
/// A fault is fatal to the current `run()` invocation and surfaces to the
/// loop's caller as [`DispatchError::HandlerFault`](crate::DispatchError::HandlerFault).
pub type HandlerError = Box<dyn std::error::Error>;

/// Capability interface for entities that handle events.
///
/// The returned `bool` means "handled": `Ok(false)` signals "not handled",
/// which is informational only and does not re-route the event.
///
/// Closures of shape `FnMut(&Event) -> bool` implement this trait directly,
/// so most targets are registered as plain closures:
///
/// ```
/// use eventide_core::EventLoop;
///
/// let event_loop = EventLoop::new();
/// let target = event_loop.handle().add_target(|event: &eventide_core::Event| {
///     println!("got event of type {:?}", event.event_type());
///     true
/// });
/// # let _ = target;
/// ```
pub trait EventHandler {
    /// Handle one delivered event.
    fn handle(&mut self, event: &Event) -> Result<bool, HandlerError>;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool,
{
    fn handle(&mut self, event: &Event) -> Result<bool, HandlerError> {
        Ok(self(event))
    }
}

/// A base handler that unconditionally declines every event.
///
/// Useful as the delegation tail when composing handlers: a specialized
/// handler checks for the kinds it owns and forwards everything else here.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl EventHandler for DefaultHandler {
    fn handle(&mut self, _event: &Event) -> Result<bool, HandlerError> {
        Ok(false)
    }
}

/// Per-target storage.
///
/// The handler is taken out of its slot for the duration of an invocation so
/// the table lock never covers user code; `None` marks a checked-out handler.
struct TargetSlot {
    handler: Option<Box<dyn EventHandler>>,
}

/// The table of registered targets.
pub(crate) struct TargetTable {
    targets: SlotMap<TargetId, TargetSlot>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self {
            targets: SlotMap::with_key(),
        }
    }

    /// Register a target and return its id.
    pub fn insert(&mut self, handler: Box<dyn EventHandler>) -> TargetId {
        let id = self.targets.insert(TargetSlot {
            handler: Some(handler),
        });
        tracing::trace!(target: "eventide_core::target", ?id, "registered target");
        id
    }

    /// Remove a target. Returns `true` if it existed.
    ///
    /// Safe to call from inside the target's own handler: the checked-out
    /// handler finishes its current invocation and is then discarded.
    pub fn remove(&mut self, id: TargetId) -> bool {
        let removed = self.targets.remove(id).is_some();
        if removed {
            tracing::trace!(target: "eventide_core::target", ?id, "removed target");
        }
        removed
    }

    /// Check whether a target is still registered.
    pub fn contains(&self, id: TargetId) -> bool {
        self.targets.contains_key(id)
    }

    /// Check out the handler for an invocation.
    ///
    /// Returns `None` if the target has vanished.
    pub fn take_handler(&mut self, id: TargetId) -> Option<Box<dyn EventHandler>> {
        self.targets.get_mut(id).and_then(|slot| slot.handler.take())
    }

    /// Return a checked-out handler to its slot.
    ///
    /// A no-op if the target was removed while its handler was running.
    pub fn restore_handler(&mut self, id: TargetId, handler: Box<dyn EventHandler>) {
        if let Some(slot) = self.targets.get_mut(id) {
            slot.handler = Some(handler);
        }
    }
}

impl Default for TargetTable {
    fn default() -> Self {
        Self::new()
    }
}
