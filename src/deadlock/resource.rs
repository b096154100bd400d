/*!
 * Lockable Resources
 *
 * Two of these, locked in opposite order from two threads, form the
 * textbook circular wait. Each resource guards only its own call counter.
 */

use parking_lot::Mutex;
use std::thread;
use std::time::Duration;
use tracing::info;

/// A named resource behind its own mutex
pub struct Resource {
    name: &'static str,
    /// Global lock-order position; lower ranks are locked first
    rank: u32,
    calls: Mutex<u64>,
}

impl Resource {
    pub fn new(name: &'static str, rank: u32) -> Self {
        Self {
            name,
            rank,
            calls: Mutex::new(0),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Calls completed on this resource so far
    ///
    /// Blocks while a harness thread holds the lock.
    pub fn calls(&self) -> u64 {
        *self.calls.lock()
    }

    /// Hold our own lock, wait `hold`, then call `other.last()`
    ///
    /// This nests a second lock acquisition inside the first. Run it from
    /// two threads on `(a, b)` and `(b, a)` and neither returns.
    pub fn f(&self, other: &Resource, hold: Duration) -> u64 {
        let mut calls = self.calls.lock();
        info!(resource = self.name, "locked own resource");

        thread::sleep(hold);

        info!(
            resource = self.name,
            waiting_for = other.name,
            "calling last() on other resource"
        );
        let seen = other.last();

        *calls += 1;
        seen
    }

    /// Requires this resource's lock
    pub fn last(&self) -> u64 {
        let mut calls = self.calls.lock();
        *calls += 1;
        info!(resource = self.name, calls = *calls, "inside last()");
        *calls
    }

    /// Same work as [`Resource::f`], with both locks taken in rank order
    ///
    /// Ties on rank are broken by address, so any two threads running this
    /// on `(a, b)` and `(b, a)` agree on which lock comes first and cannot
    /// form a cycle. Called on itself, the single lock is taken once.
    pub fn f_ordered(&self, other: &Resource, hold: Duration) -> u64 {
        if std::ptr::eq(self, other) {
            let mut calls = self.calls.lock();
            info!(resource = self.name, "locked own resource, other is self");
            thread::sleep(hold);
            *calls += 2;
            return *calls;
        }

        let (first, second) = if self.lock_key() <= other.lock_key() {
            (self, other)
        } else {
            (other, self)
        };

        let mut first_calls = first.calls.lock();
        info!(resource = first.name, "locked lower-ranked resource");
        thread::sleep(hold);
        let mut second_calls = second.calls.lock();
        info!(resource = second.name, "locked higher-ranked resource");

        // `last()` on `other` and the call on `self`, done under the held guards
        *first_calls += 1;
        *second_calls += 1;
        if std::ptr::eq(other, second) {
            *second_calls
        } else {
            *first_calls
        }
    }

    /// Total lock order: rank, then address
    #[inline]
    fn lock_key(&self) -> (u32, usize) {
        (self.rank, self as *const Resource as usize)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("rank", &self.rank)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_thread_f_completes() {
        let r1 = Resource::new("r1", 1);
        let r2 = Resource::new("r2", 2);

        assert_eq!(r1.f(&r2, Duration::ZERO), 1);
        assert_eq!(r1.calls(), 1);
        assert_eq!(r2.calls(), 1);
    }

    #[test]
    fn test_f_ordered_counts_both() {
        let r1 = Resource::new("r1", 1);
        let r2 = Resource::new("r2", 2);

        assert_eq!(r2.f_ordered(&r1, Duration::ZERO), 1);
        assert_eq!(r1.f_ordered(&r2, Duration::ZERO), 2);
        assert_eq!(r1.calls(), 2);
        assert_eq!(r2.calls(), 2);
    }

    #[test]
    fn test_f_ordered_equal_ranks_completes() {
        let a = Arc::new(Resource::new("a", 1));
        let b = Arc::new(Resource::new("b", 1));
        let (done_tx, done_rx) = flume::bounded(2);

        for (own, other) in [(a.clone(), b.clone()), (b.clone(), a.clone())] {
            let done_tx = done_tx.clone();
            // Detached: a cycle would leave these parked, not hang the test
            thread::spawn(move || {
                own.f_ordered(&other, Duration::from_millis(100));
                let _ = done_tx.send(());
            });
        }

        for _ in 0..2 {
            assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());
        }
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 2);
    }

    #[test]
    fn test_f_ordered_on_self_completes() {
        let r = Resource::new("r", 1);
        assert_eq!(r.f_ordered(&r, Duration::ZERO), 2);
        assert_eq!(r.calls(), 2);
    }
}
