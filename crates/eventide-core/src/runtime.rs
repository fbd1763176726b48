//! The event loop and its handles.
//!
//! [`EventLoop`] owns the dispatch state -- queue, timer registry, filter
//! chain, target table -- and drives it from `run()`. A [`LoopHandle`]
//! (cheaply cloned from [`EventLoop::handle`]) is the API surface host code
//! and handlers use to post, arm, install, and request quit; every handle
//! operation is safe to call from inside a currently-executing handler,
//! because no internal lock is ever held while user code runs.
//!
//! There is no global singleton: the loop is an explicitly constructed value
//! and components that need to post or arm are given a handle.
//!
//! # Example
//!
//! ```
//! use eventide_core::{EventLoop, EventType};
//!
//! let event_loop = EventLoop::new();
//! let handle = event_loop.handle();
//!
//! let greeting = EventType::register();
//! let quitter = handle.clone();
//! let target = handle.add_target(move |event: &eventide_core::Event| {
//!     if event.event_type() == greeting {
//!         println!("{}", event.payload::<String>().unwrap());
//!         quitter.request_quit(0);
//!     }
//!     true
//! });
//!
//! handle.post(target, greeting, String::from("hello")).unwrap();
//! let code = event_loop.run().unwrap();
//! assert_eq!(code, 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use static_assertions::assert_impl_all;

use crate::error::{DispatchError, Result};
use crate::event::{Event, EventType};
use crate::filter::{FilterChain, FilterDecision, FilterId, FilterScope};
use crate::queue::EventQueue;
use crate::target::{EventHandler, TargetId, TargetTable};
use crate::timer::{TimerId, TimerKind, TimerRegistry};
use crate::wake::{WakeHandle, WakeSource, wake_pair};

/// The lifecycle phase of an event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Constructed, `run()` not yet called.
    Idle,
    /// Inside `run()`, dispatching events.
    Running,
    /// Inside `run()` with a quit request pending; the loop stops at the
    /// next iteration boundary.
    QuitPending,
    /// `run()` has returned.
    Stopped,
}

const PHASE_IDLE: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_STOPPED: u8 = 2;

/// Quit request state, shared with [`QuitHandle`].
struct QuitState {
    requested: AtomicBool,
    code: AtomicI32,
}

impl QuitState {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            code: AtomicI32::new(0),
        }
    }

    fn request(&self, code: i32) {
        // Code first: a reader that observes the flag must see the code.
        self.code.store(code, Ordering::SeqCst);
        self.requested.store(true, Ordering::SeqCst);
    }

    fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn code(&self) -> i32 {
        self.code.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
        self.code.store(0, Ordering::SeqCst);
    }
}

/// State owned by one event loop and shared with its handles.
struct LoopShared {
    queue: Mutex<EventQueue>,
    timers: Mutex<TimerRegistry>,
    filters: Mutex<FilterChain>,
    targets: Mutex<TargetTable>,
    quit: Arc<QuitState>,
    phase: AtomicU8,
    wake: WakeHandle,
}

impl LoopShared {
    fn phase(&self) -> LoopPhase {
        match self.phase.load(Ordering::SeqCst) {
            PHASE_RUNNING => {
                if self.quit.requested() {
                    LoopPhase::QuitPending
                } else {
                    LoopPhase::Running
                }
            }
            PHASE_STOPPED => LoopPhase::Stopped,
            _ => LoopPhase::Idle,
        }
    }
}

/// A single-threaded event-dispatch loop.
///
/// Merges timer expirations into the event queue, pops one event per
/// iteration, runs it through the filter chain, delivers it to the addressed
/// target, and evaluates pending quit requests between iterations.
pub struct EventLoop {
    shared: Arc<LoopShared>,
    wake: WakeSource,
}

impl EventLoop {
    /// Create a new event loop.
    pub fn new() -> Self {
        let (wake_handle, wake_source) = wake_pair();
        Self {
            shared: Arc::new(LoopShared {
                queue: Mutex::new(EventQueue::new()),
                timers: Mutex::new(TimerRegistry::new()),
                filters: Mutex::new(FilterChain::new()),
                targets: Mutex::new(TargetTable::new()),
                quit: Arc::new(QuitState::new()),
                phase: AtomicU8::new(PHASE_IDLE),
                wake: wake_handle,
            }),
            wake: wake_source,
        }
    }

    /// Get a handle for posting, arming, installing, and connecting.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: self.shared.clone(),
        }
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> LoopPhase {
        self.shared.phase()
    }

    /// Run the loop until a quit request is honored.
    ///
    /// Blocks the calling thread, dispatching one event per iteration and
    /// sleeping on the wake source when there is no work. Returns the exit
    /// code passed to [`LoopHandle::request_quit`]. A pending quit request
    /// is cleared at the moment a fresh run begins; once set during the run
    /// it stays set until the loop honors it.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::LoopAlreadyRunning`] if called reentrantly.
    /// - [`DispatchError::HandlerFault`] if a target handler fails; the loop
    ///   stops, and side effects of events already delivered stand.
    pub fn run(&self) -> Result<i32> {
        if self.shared.phase.swap(PHASE_RUNNING, Ordering::SeqCst) == PHASE_RUNNING {
            return Err(DispatchError::LoopAlreadyRunning);
        }
        self.shared.quit.reset();
        tracing::info!(target: "eventide_core::event_loop", "starting event loop");

        let result = self.dispatch_loop();

        self.shared.phase.store(PHASE_STOPPED, Ordering::SeqCst);
        match &result {
            Ok(code) => {
                tracing::info!(target: "eventide_core::event_loop", code, "event loop stopped");
            }
            Err(err) => {
                tracing::error!(target: "eventide_core::event_loop", %err, "event loop stopped on fault");
            }
        }
        result
    }

    fn dispatch_loop(&self) -> Result<i32> {
        loop {
            // Quit is honored only here, at the iteration boundary, after
            // the previous handler and its emissions fully unwound.
            if self.shared.quit.requested() {
                return Ok(self.shared.quit.code());
            }

            self.enqueue_due_timers();

            let event = self.shared.queue.lock().pop_next();
            match event {
                Some(event) => self.dispatch(event)?,
                None => {
                    // Re-check before sleeping: a quit raised after the check
                    // at the top still has its wake token in the channel.
                    if self.shared.quit.requested() {
                        continue;
                    }
                    let timeout = {
                        let mut timers = self.shared.timers.lock();
                        timers.time_until_next(Instant::now())
                    };
                    self.wake.wait(timeout);
                }
            }
        }
    }

    /// Cooperative, non-blocking variant of `run`: dispatch the due timers
    /// and currently queued events, then return control to the caller.
    ///
    /// Events posted by the handlers that run during this call stay queued
    /// for the next call. Returns the number of events dispatched; stops
    /// early if a quit is requested.
    pub fn process_pending(&self) -> Result<usize> {
        self.enqueue_due_timers();

        let budget = self.shared.queue.lock().pending_count();
        let mut processed = 0;
        for _ in 0..budget {
            if self.shared.quit.requested() {
                break;
            }
            let Some(event) = self.shared.queue.lock().pop_next() else {
                break;
            };
            self.dispatch(event)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Move every due timer expiry into the event queue, in deadline order.
    fn enqueue_due_timers(&self) {
        let due = self.shared.timers.lock().process_due(Instant::now());
        if due.is_empty() {
            return;
        }
        tracing::trace!(target: "eventide_core::event_loop", count = due.len(), "enqueueing timer events");
        let mut queue = self.shared.queue.lock();
        for event in due {
            queue.post(event);
        }
    }

    /// Run one event through the filter chain and deliver it to its target.
    fn dispatch(&self, event: Event) -> Result<()> {
        // Snapshot the matching interceptors so the chain lock is not held
        // while they run; an interceptor may install or remove filters for
        // subsequent events.
        let interceptors = self.shared.filters.lock().matching(event.target());
        for interceptor in interceptors {
            if interceptor(&event) == FilterDecision::Consumed {
                tracing::trace!(target: "eventide_core::event_loop", ?event, "event consumed by filter");
                return Ok(());
            }
        }

        // Check the handler out of its slot for the invocation; the target
        // table lock must not cover user code.
        let Some(mut handler) = self.shared.targets.lock().take_handler(event.target()) else {
            tracing::debug!(target: "eventide_core::event_loop", ?event, "target vanished, dropping event");
            return Ok(());
        };

        let outcome = handler.handle(&event);

        // If the handler removed its own target, the slot is gone and the
        // handler is discarded here.
        self.shared
            .targets
            .lock()
            .restore_handler(event.target(), handler);

        match outcome {
            Ok(handled) => {
                tracing::trace!(target: "eventide_core::event_loop", ?event, handled, "delivered event");
                Ok(())
            }
            Err(fault) => Err(DispatchError::HandlerFault(fault)),
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable handle to an event loop.
///
/// Handles are how host code and in-flight handlers interact with the loop;
/// every operation is reentrant by construction. Handles are intentionally
/// not `Send` -- the runtime is single-threaded. For termination requests
/// from other threads, see [`LoopHandle::quit_handle`].
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<LoopShared>,
}

impl LoopHandle {
    // ---------------------------------------------------------------------
    // Posting
    // ---------------------------------------------------------------------

    /// Enqueue an event for `target`.
    ///
    /// A pure append: nothing is delivered synchronously, and posting always
    /// succeeds even if the target later vanishes (delivery to a vanished
    /// target is silently dropped).
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownEventType`] if `event_type` was never
    /// registered.
    pub fn post<P>(&self, target: TargetId, event_type: EventType, payload: P) -> Result<()>
    where
        P: std::any::Any + Send,
    {
        self.post_event(Event::new(event_type, target, payload))
    }

    /// Enqueue an already constructed event.
    pub fn post_event(&self, event: Event) -> Result<()> {
        if !event.event_type().is_registered() {
            return Err(DispatchError::UnknownEventType(event.event_type()));
        }
        self.shared.queue.lock().post(event);
        self.shared.wake.wake();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Targets
    // ---------------------------------------------------------------------

    /// Register an event target and return its id.
    ///
    /// Plain closures of shape `FnMut(&Event) -> bool` work directly; see
    /// [`EventHandler`] for fallible handlers.
    pub fn add_target<H>(&self, handler: H) -> TargetId
    where
        H: EventHandler + 'static,
    {
        self.shared.targets.lock().insert(Box::new(handler))
    }

    /// Remove a target. Pending events addressed to it are dropped at
    /// delivery time. Returns `true` if the target existed.
    pub fn remove_target(&self, id: TargetId) -> bool {
        self.shared.targets.lock().remove(id)
    }

    /// Check whether a target is still registered.
    pub fn has_target(&self, id: TargetId) -> bool {
        self.shared.targets.lock().contains(id)
    }

    // ---------------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------------

    /// Arm a timer whose expiry events are addressed to `target`.
    ///
    /// A zero-interval one-shot fires as soon as the loop is idle, ahead of
    /// every due-later deadline -- the way to defer startup work into the
    /// loop.
    ///
    /// # Errors
    ///
    /// [`TimerError::ZeroIntervalRepeating`](crate::TimerError::ZeroIntervalRepeating)
    /// for a zero-interval repeating timer.
    pub fn arm(&self, interval: Duration, kind: TimerKind, target: TargetId) -> Result<TimerId> {
        let id = self
            .shared
            .timers
            .lock()
            .arm(Instant::now(), interval, kind, target)?;
        // Wake the loop to recalculate its deadline.
        self.shared.wake.wake();
        Ok(id)
    }

    /// Cancel a timer. Returns `true` if it was armed.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.shared.timers.lock().cancel(id)
    }

    /// Check if a timer is currently armed.
    pub fn is_timer_active(&self, id: TimerId) -> bool {
        self.shared.timers.lock().is_active(id)
    }

    // ---------------------------------------------------------------------
    // Filters
    // ---------------------------------------------------------------------

    /// Install an interceptor on `scope`, appended in install order.
    pub fn install_filter<F>(&self, scope: FilterScope, interceptor: F) -> FilterId
    where
        F: Fn(&Event) -> FilterDecision + 'static,
    {
        self.shared.filters.lock().install(scope, interceptor)
    }

    /// Uninstall an interceptor. Returns `true` if it was installed.
    pub fn remove_filter(&self, id: FilterId) -> bool {
        self.shared.filters.lock().remove(id)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Request the loop to stop with `code`.
    ///
    /// Only sets a flag and wakes the loop: it never unwinds the caller, and
    /// the quit takes effect at the next iteration boundary, after the
    /// currently-executing handler and all of its synchronous emissions have
    /// completed.
    pub fn request_quit(&self, code: i32) {
        tracing::info!(target: "eventide_core::event_loop", code, "quit requested");
        self.shared.quit.request(code);
        self.shared.wake.wake();
    }

    /// Get a `Send + Sync` handle that can request termination from another
    /// thread (say, a Ctrl-C handler).
    pub fn quit_handle(&self) -> QuitHandle {
        QuitHandle {
            quit: self.shared.quit.clone(),
            wake: self.shared.wake.clone(),
        }
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> LoopPhase {
        self.shared.phase()
    }
}

/// A thread-safe termination handle.
///
/// The one deliberately cross-thread surface of the runtime: it touches only
/// the quit flag and the wake channel, honoring "an external caller may
/// request loop termination" without opening the door to cross-thread
/// posting.
#[derive(Clone)]
pub struct QuitHandle {
    quit: Arc<QuitState>,
    wake: WakeHandle,
}

impl QuitHandle {
    /// Request the loop to stop with `code`, waking it if it is asleep.
    pub fn request_quit(&self, code: i32) {
        self.quit.request(code);
        self.wake.wake();
    }
}

assert_impl_all!(QuitHandle: Send, Sync);
