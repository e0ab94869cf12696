//! Time provider abstraction
//!
//! Datasources that record recency (autofill history, search history,
//! notification send times, user data updates) ask a [`Clock`] for the
//! current time instead of reading the system clock directly, so tests can
//! pin and step time.
//!
//! # Example
//!
//! ```
//! use vaultkeep::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let millis = clock.now_millis();
//! assert!(millis > 0);
//! ```

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "testing"))]
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Test clock with auto-advancing time.
///
/// Every `now_millis()` call returns the current value and then moves the
/// clock forward by one millisecond, so consecutive writes always get
/// strictly increasing timestamps. Use `hold()` to freeze it.
///
/// # Example
///
/// ```
/// use vaultkeep::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// let t1 = clock.now_millis();
/// let t2 = clock.now_millis();
/// assert!(t2 > t1);
///
/// {
///     let _hold = clock.hold();
///     assert_eq!(clock.now_millis(), clock.now_millis());
/// }
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

#[cfg(any(test, feature = "testing"))]
struct FixedClockState {
    millis: i64,
    held: bool,
}

/// RAII guard that freezes a [`FixedClock`] while held.
#[cfg(any(test, feature = "testing"))]
pub struct ClockHold<'a>(&'a FixedClock);

#[cfg(any(test, feature = "testing"))]
impl Drop for ClockHold<'_> {
    fn drop(&mut self) {
        self.0.state().held = false;
    }
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: i64) -> Self {
        Self {
            state: Mutex::new(FixedClockState {
                millis,
                held: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FixedClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold the clock, preventing auto-advance until the guard is dropped.
    pub fn hold(&self) -> ClockHold<'_> {
        self.state().held = true;
        ClockHold(self)
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: i64) {
        self.state().millis += ms;
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: i64) {
        self.state().millis = ms;
    }

    /// Get the current time without advancing.
    pub fn get(&self) -> i64 {
        self.state().millis
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        let mut state = self.state();
        let t = state.millis;
        if !state.held {
            state.millis += 1;
        }
        t
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200_000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("FixedClock")
            .field("millis", &state.millis)
            .field("held", &state.held)
            .finish()
    }
}
