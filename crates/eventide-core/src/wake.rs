//! The loop's wake source.
//!
//! The event loop does not implement OS-level I/O multiplexing; it blocks on
//! a [`WakeSource`] -- the one suspension point in the whole runtime -- and
//! anything that makes work available (a post, a newly armed timer, a quit
//! request) nudges it through a [`WakeHandle`].
//!
//! The default pairing is a channel: handles send unit tokens, the source
//! waits on the receiving end with the next timer deadline as the timeout.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use static_assertions::assert_impl_all;

/// Create a connected wake handle / wake source pair.
pub(crate) fn wake_pair() -> (WakeHandle, WakeSource) {
    let (tx, rx) = unbounded();
    (WakeHandle { tx }, WakeSource { rx })
}

/// The waiting side, owned by the event loop.
pub(crate) struct WakeSource {
    rx: Receiver<()>,
}

impl WakeSource {
    /// Block until a wake arrives or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns `true` if an explicit wake was
    /// received. Stale tokens from work already processed wake the loop
    /// spuriously; callers re-examine their state after every return.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(()) => true,
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => false,
            },
            // The loop's shared state holds a WakeHandle, so the channel
            // cannot disconnect while the loop is alive.
            None => self.rx.recv().is_ok(),
        }
    }
}

/// The notifying side. Cheap to clone and safe to use from other threads,
/// which is what lets an external caller (a Ctrl-C handler, say) wake the
/// loop for a quit request.
#[derive(Clone)]
pub(crate) struct WakeHandle {
    tx: Sender<()>,
}

impl WakeHandle {
    /// Wake the loop. Never blocks; a send after the loop is gone is a no-op.
    pub fn wake(&self) {
        let _ = self.tx.send(());
    }
}

assert_impl_all!(WakeHandle: Send, Sync);
