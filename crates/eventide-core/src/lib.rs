//! Eventide core: a single-threaded event-dispatch runtime.
//!
//! This crate provides the foundational pieces of an event-driven host
//! application:
//!
//! - **Event Loop**: accepts posted events and expiring timers, delivers one
//!   event per iteration, honors quit requests cooperatively
//! - **Event Types**: a process-wide registry so user-defined event kinds
//!   never collide with built-in kinds
//! - **Timers**: one-shot and repeating timers with drift-free, coalesced
//!   catch-up
//! - **Filter Chain**: interceptors that can observe and veto delivery
//!   before the target sees an event
//! - **Signal/Slot System**: synchronous, reentrant-safe observer
//!   notification
//!
//! # Signal/Slot Example
//!
//! ```
//! use eventide_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Event Loop Example
//!
//! ```
//! use std::time::Duration;
//! use eventide_core::{Event, EventLoop, EventType, TimerKind};
//!
//! let event_loop = EventLoop::new();
//! let handle = event_loop.handle();
//!
//! // A target that quits once its timer fires.
//! let quitter = handle.clone();
//! let target = handle.add_target(move |event: &Event| {
//!     if event.timer_id().is_some() {
//!         println!("tick");
//!         quitter.request_quit(0);
//!     }
//!     true
//! });
//!
//! // Zero-interval one-shot: runs as soon as the loop is idle.
//! handle.arm(Duration::ZERO, TimerKind::OneShot, target).unwrap();
//!
//! // Run the loop (blocks until the quit request is honored).
//! let exit_code = event_loop.run().unwrap();
//! assert_eq!(exit_code, 0);
//! ```
//!
//! # Quit is cooperative
//!
//! [`LoopHandle::request_quit`] only sets a flag: it never unwinds the
//! calling handler, and the loop stops at the next iteration boundary, after
//! the current handler and all of its synchronous signal emissions have
//! completed. This is the central ordering property of the runtime.

mod error;
mod event;
mod filter;
pub mod logging;
mod queue;
pub mod signal;
mod target;
mod timer;
mod wake;

mod runtime;

pub use error::{DispatchError, Result, TimerError};
pub use event::{Event, EventType};
pub use filter::{FilterDecision, FilterId, FilterScope};
pub use runtime::{EventLoop, LoopHandle, LoopPhase, QuitHandle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use target::{DefaultHandler, EventHandler, HandlerError, TargetId};
pub use timer::{TimerId, TimerKind};
