//! Wait strategies applied when `put` finds the queue full or `get` finds it
//! empty.
//!
//! A strategy is chosen per direction at construction and monomorphized into
//! the queue, so the spinning variants compile down to nothing on the fast
//! path. The strategies trade latency against CPU cost:
//!
//! - [`SpinWait`]: pure busy loop, lowest latency on reserved cores
//! - [`PauseWait`]: busy loop with the CPU's spin hint, SMT-friendly
//! - [`YieldWait`]: hands the core back to the scheduler each round
//! - [`BlockWait`]: sleeps on a condition variable, for deep queues and
//!   long idles
//!
//! Polling callers use the `try_put` / `try_get` operations instead, which
//! never consult a strategy.

use std::hint;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Emits the architecture's low-power spin hint (x86 `PAUSE`, ARM `YIELD`);
/// a no-op on architectures without one. All busy-waiting in the crate goes
/// through this function.
#[inline]
pub(crate) fn cpu_pause() {
    hint::spin_loop();
}

/// Policy applied when an operation must wait for the opposite side.
///
/// `wait` is allowed to return before the predicate holds; callers re-check
/// their condition in a loop. The spinning variants rely on that outer loop,
/// while [`BlockWait`] only returns once the predicate is satisfied.
///
/// `notify` is called by the opposite side after it has made progress and
/// must be safe to call when nobody is waiting.
pub trait WaitStrategy: Default + Send + Sync {
    /// Waits until progress might have been made.
    fn wait<P: Fn() -> bool>(&self, predicate: P);

    /// Wakes every thread blocked in [`wait`](Self::wait).
    fn notify(&self);
}

/// Busy-spins without any hint. The whole wait/notify pair compiles away.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinWait;

impl WaitStrategy for SpinWait {
    #[inline]
    fn wait<P: Fn() -> bool>(&self, _predicate: P) {}

    #[inline]
    fn notify(&self) {}
}

/// Busy-spins with the CPU's low-power spin hint between re-checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PauseWait;

impl WaitStrategy for PauseWait {
    #[inline]
    fn wait<P: Fn() -> bool>(&self, _predicate: P) {
        cpu_pause();
    }

    #[inline]
    fn notify(&self) {}
}

/// Yields the thread to the OS scheduler between re-checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldWait;

impl WaitStrategy for YieldWait {
    #[inline]
    fn wait<P: Fn() -> bool>(&self, _predicate: P) {
        thread::yield_now();
    }

    #[inline]
    fn notify(&self) {}
}

/// Sleeps on a condition variable until the predicate holds.
///
/// The notifying side does not take the mutex, so a wakeup can race past a
/// waiter that has checked the predicate but not yet parked. The timed wait
/// bounds how long such a missed wakeup can delay the waiter.
#[derive(Debug, Default)]
pub struct BlockWait {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockWait {
    /// Upper bound on a single park before the predicate is re-checked.
    const RECHECK_INTERVAL: Duration = Duration::from_millis(1);

    /// Creates a new condition-variable wait state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockWait {
    fn wait<P: Fn() -> bool>(&self, predicate: P) {
        // The data under the mutex is (), so a poisoned lock carries no
        // broken state worth propagating.
        let mut guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        while !predicate() {
            let (next, _timed_out) = self
                .condvar
                .wait_timeout(guard, Self::RECHECK_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
        drop(guard);
    }

    fn notify(&self) {
        self.condvar.notify_all();
    }
}
