//! Error types for Eventide.

use std::fmt;

use crate::event::EventType;

/// The main error type for dispatch operations.
#[derive(Debug)]
pub enum DispatchError {
    /// An event was posted with a type tag that was never registered.
    UnknownEventType(EventType),
    /// Timer-related error.
    Timer(TimerError),
    /// A target handler failed while processing an event.
    ///
    /// Handler faults are fatal to the current `run()` invocation: the loop
    /// stops and the fault surfaces to the caller. Side effects of events
    /// already delivered are not rolled back.
    HandlerFault(Box<dyn std::error::Error>),
    /// `run()` was called while the loop is already running.
    LoopAlreadyRunning,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEventType(ty) => {
                write!(f, "Unregistered event type {}", ty.as_u32())
            }
            Self::Timer(err) => write!(f, "Timer error: {err}"),
            Self::HandlerFault(err) => write!(f, "Event handler failed: {err}"),
            Self::LoopAlreadyRunning => {
                write!(f, "The event loop is already running")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
            Self::HandlerFault(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Timer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A repeating timer was armed with a zero interval.
    ///
    /// Zero means "fire as soon as the loop is idle", which is only
    /// meaningful for one-shot timers; a zero-interval repeating timer
    /// would monopolize the loop.
    ZeroIntervalRepeating,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIntervalRepeating => {
                write!(f, "Repeating timers require a non-zero interval")
            }
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for DispatchError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

/// A specialized Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
