//! Signal/slot system: synchronous, reentrant-safe observer notification.
//!
//! Signals are owned by their emitters; connected slots are invoked
//! synchronously, in connection order, on the calling execution context.
//! Emission takes a snapshot of the currently-connected slots up front and
//! never holds the connection table lock while a slot runs, so slots may
//! freely connect, disconnect, or re-emit -- each emission owns its own
//! snapshot and stack frame.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type; connect slots, then `emit`
//! - [`ConnectionId`] - Unique identifier returned by [`Signal::connect`]
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Reentrancy rules
//!
//! - A slot disconnected during an emission is not invoked by that emission,
//!   even if the snapshot had already captured it. A slot that disconnects
//!   itself still completes its in-flight invocation, exactly once.
//! - A slot connected during an emission is only invoked by future emissions.
//! - A slot may emit the same signal recursively; bus state is never
//!   corrupted because the lock only covers table mutation and snapshotting.
//!
//! # Example
//!
//! ```
//! use eventide_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via
    /// [`Signal::disconnect`]. The ID remains valid until the connection is
    /// explicitly disconnected or the signal is dropped.
    pub struct ConnectionId;
}

/// Internal storage for a single connection.
struct Connection<Args> {
    /// The slot function to invoke.
    slot: Arc<dyn Fn(&Args)>,
    /// Connection order. The arena reuses freed slot indices, so iteration
    /// order is not connection order; this counter is what emission sorts by.
    seq: u64,
}

/// A type-safe signal with synchronously invoked slots.
///
/// When a signal is emitted, every connected slot is invoked with the
/// provided arguments before `emit` returns -- there is no suspension point.
/// Slots run in connection order.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for
///   signals with no arguments, or a tuple like `(String, i32)` for several.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    /// Connection-order counter.
    next_seq: AtomicU64,
    /// Whether emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            next_seq: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().insert(Connection {
            slot: Arc::new(slot),
            seq,
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed. Once this
    /// returns, the slot is never invoked again -- including by an emission
    /// that is currently in flight and had not yet reached it.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing. Useful during
    /// initialization or batch updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots synchronously.
    ///
    /// The set of slots is snapshotted at the moment of emission; each entry
    /// is invoked only if it is still connected when its turn comes. Slots
    /// run to completion, in connection order, before `emit` returns.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "eventide_core::signal", "signal blocked, skipping emit");
            return;
        }

        let mut snapshot: Vec<(ConnectionId, u64, Arc<dyn Fn(&Args)>)> = {
            let connections = self.connections.lock();
            tracing::trace!(
                target: "eventide_core::signal",
                connection_count = connections.len(),
                "emitting signal"
            );
            connections
                .iter()
                .map(|(id, conn)| (id, conn.seq, conn.slot.clone()))
                .collect()
        };
        // Arena iteration order is not connection order once freed slot
        // indices get reused; sort by the connection counter.
        snapshot.sort_unstable_by_key(|&(_, seq, _)| seq);

        for (id, _, slot) in snapshot {
            // Skip slots disconnected since the snapshot was taken.
            if !self.connections.lock().contains_key(id) {
                continue;
            }
            slot(&args);
        }
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// This is useful for RAII-style connection management, ensuring connections
/// are cleaned up when the receiver goes out of scope. Created via
/// [`Signal::connect_scoped`].
///
/// # Example
///
/// ```
/// use eventide_core::Signal;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let signal = Signal::<i32>::new();
/// let total = Rc::new(Cell::new(0));
/// {
///     let total = total.clone();
///     let _guard = signal.connect_scoped(move |&n| total.set(total.get() + n));
///     signal.emit(42);
/// }
/// signal.emit(43); // Nothing happens - connection was dropped
/// assert_eq!(total.get(), 42);
/// ```
pub struct ConnectionGuard<Args> {
    signal: *const Signal<Args>,
    id: ConnectionId,
}

impl<Args> Signal<Args> {
    /// Connect a slot with automatic disconnection when the guard is dropped.
    ///
    /// # Safety
    ///
    /// The returned guard holds a raw pointer to this signal. The signal must
    /// outlive the guard; `Rc<Signal<Args>>` is recommended for shared
    /// ownership.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: self as *const Signal<Args>,
            id,
        }
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        // SAFETY: The signal pointer is valid if the guard is used correctly.
        // The caller must ensure the signal outlives the guard.
        unsafe {
            if !self.signal.is_null() {
                let _ = (*self.signal).disconnect(self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.borrow_mut().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.borrow(), vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.borrow_mut().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        assert_eq!(*received.borrow(), vec![1]);
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            signal.connect(move |_| order.borrow_mut().push(label));
        }

        signal.emit(());
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_connection_order_survives_slot_reuse() {
        let signal = Signal::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_first = order.clone();
        let first = signal.connect(move |_| order_first.borrow_mut().push("first"));
        let order_second = order.clone();
        signal.connect(move |_| order_second.borrow_mut().push("second"));

        // Disconnecting frees a slot index the next connect may reuse; the
        // later connection must still run after the older one.
        signal.disconnect(first);
        let order_third = order.clone();
        signal.connect(move |_| order_third.borrow_mut().push("third"));

        signal.emit(());
        assert_eq!(*order.borrow(), vec!["second", "third"]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.borrow_mut().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        signal.emit(2); // Should be ignored
        signal.set_blocked(false);
        signal.emit(3);

        assert_eq!(*received.borrow(), vec![1, 3]);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();

        for _ in 0..5 {
            signal.connect(|_| {});
        }

        assert_eq!(signal.connection_count(), 5);
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));

        {
            let received_clone = received.clone();
            let _guard = signal.connect_scoped(move |&value| {
                received_clone.borrow_mut().push(value);
            });
            signal.emit(1);
        } // Guard dropped here, connection should be removed

        signal.emit(2); // Should not be received

        assert_eq!(*received.borrow(), vec![1]);
    }

    #[test]
    fn test_self_disconnect_completes_current_invocation() {
        let signal = Rc::new(Signal::<()>::new());
        let calls = Rc::new(RefCell::new(0));

        let conn_id = Rc::new(RefCell::new(None));
        let signal_clone = signal.clone();
        let calls_clone = calls.clone();
        let conn_clone = conn_id.clone();
        let id = signal.connect(move |_| {
            *calls_clone.borrow_mut() += 1;
            // Self-disconnect mid-invocation.
            let id = conn_clone.borrow().unwrap();
            signal_clone.disconnect(id);
        });
        *conn_id.borrow_mut() = Some(id);

        signal.emit(());
        signal.emit(());

        // Invoked exactly once, never again after its self-disconnect.
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_disconnect_other_slot_during_emission() {
        let signal = Rc::new(Signal::<()>::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let second_id = Rc::new(RefCell::new(None));

        let signal_clone = signal.clone();
        let order_clone = order.clone();
        let second_clone = second_id.clone();
        signal.connect(move |_| {
            order_clone.borrow_mut().push("first");
            // Disconnect the not-yet-invoked slot; it must not run in this
            // emission either.
            let id = second_clone.borrow().unwrap();
            signal_clone.disconnect(id);
        });

        let order_clone = order.clone();
        let id = signal.connect(move |_| {
            order_clone.borrow_mut().push("second");
        });
        *second_id.borrow_mut() = Some(id);

        signal.emit(());
        assert_eq!(*order.borrow(), vec!["first"]);
    }

    #[test]
    fn test_connect_during_emission_only_affects_future_emissions() {
        let signal = Rc::new(Signal::<()>::new());
        let hits = Rc::new(RefCell::new(Vec::new()));

        let hits_clone = hits.clone();
        signal.connect(move |_| {
            hits_clone.borrow_mut().push("existing");
        });

        let signal_clone = signal.clone();
        let hits_clone = hits.clone();
        let once = Rc::new(RefCell::new(false));
        signal.connect(move |_| {
            hits_clone.borrow_mut().push("adder");
            if !*once.borrow() {
                *once.borrow_mut() = true;
                // Connecting from inside a slot must not fire in this emission.
                let hits_new = hits_clone.clone();
                signal_clone.connect(move |_| {
                    hits_new.borrow_mut().push("late");
                });
            }
        });

        signal.emit(());
        assert_eq!(*hits.borrow(), vec!["existing", "adder"]);

        signal.emit(());
        assert_eq!(
            *hits.borrow(),
            vec!["existing", "adder", "existing", "adder", "late"]
        );
    }

    #[test]
    fn test_recursive_emission() {
        let signal = Rc::new(Signal::<u32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let signal_clone = signal.clone();
        let log_clone = log.clone();
        signal.connect(move |&depth| {
            log_clone.borrow_mut().push(depth);
            if depth < 3 {
                signal_clone.emit(depth + 1);
            }
        });

        signal.emit(0);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_signal_with_multiple_args() {
        let signal = Signal::<(String, i32)>::new();
        let received = Rc::new(RefCell::new(None));

        let received_clone = received.clone();
        signal.connect(move |args| {
            *received_clone.borrow_mut() = Some(args.clone());
        });

        signal.emit(("hello".to_string(), 42));

        assert_eq!(
            received.borrow().clone(),
            Some(("hello".to_string(), 42))
        );
    }
}
