//! Logging facilities.
//!
//! Eventide instruments its subsystems with the `tracing` crate. Nothing is
//! emitted unless the host installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! Every log line carries a per-subsystem target so hosts can filter, e.g.
//! `RUST_LOG=eventide_core::timer=trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "eventide_core";
    /// Event loop target.
    pub const EVENT_LOOP: &str = "eventide_core::event_loop";
    /// Event type registry target.
    pub const EVENT: &str = "eventide_core::event";
    /// Timer registry target.
    pub const TIMER: &str = "eventide_core::timer";
    /// Filter chain target.
    pub const FILTER: &str = "eventide_core::filter";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "eventide_core::signal";
    /// Target table target.
    pub const TARGET: &str = "eventide_core::target";
}
