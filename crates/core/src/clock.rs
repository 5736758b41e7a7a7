//! Time sources for event stamps.
//!
//! The clock is shared: it belongs to the entity that created the event
//! publisher and is only read when an event is actually published.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Failure to read a clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The clock has no valid time yet (e.g. simulated time not received).
    #[error("clock '{0}' is not ready")]
    NotReady(&'static str),

    /// The current time cannot be expressed as `i64` nanoseconds.
    #[error("clock '{0}' is out of the representable range")]
    OutOfRange(&'static str),
}

/// A source of nanosecond timestamps.
pub trait Clock: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Current time in nanoseconds since the clock's epoch.
    fn now(&self) -> Result<i64, ClockError>;
}

/// Wall clock, nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn name(&self) -> &'static str {
        "system"
    }

    fn now(&self) -> Result<i64, ClockError> {
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .ok_or(ClockError::OutOfRange(self.name()))
    }
}

/// Externally driven clock.
///
/// Starts unset; [`ManualClock::now`] fails with [`ClockError::NotReady`]
/// until a time is set. Useful for simulated time and for tests.
///
/// ```
/// use introspect_core::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// assert!(clock.now().is_err());
///
/// clock.set(1_500_000_000);
/// clock.advance(10);
/// assert_eq!(clock.now().unwrap(), 1_500_000_010);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
    set: AtomicBool,
}

impl ManualClock {
    /// Create an unset clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nanos: AtomicI64::new(0),
            set: AtomicBool::new(false),
        }
    }

    /// Create a clock already set to `nanos`.
    #[must_use]
    pub fn starting_at(nanos: i64) -> Self {
        let clock = Self::new();
        clock.set(nanos);
        clock
    }

    /// Set the current time.
    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
        self.set.store(true, Ordering::SeqCst);
    }

    /// Move the current time forward by `nanos`.
    pub fn advance(&self, nanos: i64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Forget the current time; reads fail until [`ManualClock::set`] is called again.
    pub fn reset(&self) {
        self.set.store(false, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn now(&self) -> Result<i64, ClockError> {
        if !self.set.load(Ordering::SeqCst) {
            return Err(ClockError::NotReady(self.name()));
        }
        Ok(self.nanos.load(Ordering::SeqCst))
    }
}
