/*!
 * Synchronization Traits
 *
 * Core abstractions for the wait/notify side of cancellation.
 */

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    /// Build from a raw count as returned by `Condvar::notify_all`
    #[inline]
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(count)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

impl std::ops::Add for WakeResult {
    type Output = WakeResult;

    fn add(self, rhs: WakeResult) -> WakeResult {
        WakeResult::from_count(self.count() + rhs.count())
    }
}

/// Something parked threads can be kicked out of
///
/// Implementors must wake every thread currently parked on them so each one
/// re-checks its own exit condition. Waking a thread that then decides to
/// keep waiting is harmless.
///
/// `wake` is called with no other lock held by the caller, so it is free to
/// take the implementor's own mutex.
pub trait Wake: Send + Sync {
    /// Wake all parked threads
    fn wake(&self) -> WakeResult;
}
