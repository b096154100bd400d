/*!
 * Cancellation Tokens
 *
 * Cooperative cancellation for threads parked on a condition variable.
 *
 * # Lock Ordering
 *
 * A token owns one small mutex (its listener list) and each exchange owns
 * one mutex (its slot). The two are never held at the same time:
 *
 * - A waiter registers with the token *before* taking the exchange mutex,
 *   and unregisters *after* releasing it.
 * - `cancel()` sets the flag, drains the listener list, releases the token
 *   mutex, and only then wakes each listener (which takes the exchange mutex).
 *
 * Waiters check the flag while holding the exchange mutex, and `wake` takes
 * that same mutex before notifying, so a cancel that lands between the check
 * and the park is never lost.
 */

use super::traits::{Wake, WakeResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

struct Listener {
    id: u64,
    target: Weak<dyn Wake>,
}

struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// Cloneable cancellation handle
///
/// All clones share one flag. Once cancelled a token stays cancelled.
///
/// # Examples
///
/// ```
/// use slot_exchange::core::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
/// assert!(!worker_token.is_cancelled());
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel the token and wake everything parked under it
    ///
    /// Returns how many parked threads were woken. Cancelling twice is a
    /// no-op the second time.
    pub fn cancel(&self) -> WakeResult {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return WakeResult::NoWaiters;
        }

        let listeners = std::mem::take(&mut *self.inner.listeners.lock());

        let woken = listeners
            .iter()
            .filter_map(|listener| listener.target.upgrade())
            .fold(WakeResult::NoWaiters, |acc, target| acc + target.wake());

        debug!(
            listeners = listeners.len(),
            woken = woken.count(),
            "cancellation token fired"
        );
        woken
    }

    /// Number of currently registered listeners (for diagnostics)
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Guard that cancels this token if its thread unwinds before dropping it
    ///
    /// Peers parked under the token are released instead of waiting on a
    /// thread that is gone.
    pub(crate) fn cancel_on_panic(&self) -> CancelOnPanic {
        CancelOnPanic {
            token: self.clone(),
        }
    }

    /// Register a wake target for the lifetime of the returned guard
    ///
    /// Must be called without holding the target's own lock.
    pub(crate) fn register(&self, target: Weak<dyn Wake>) -> Registration<'_> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.inner.listeners.lock();
        listeners.retain(|listener| listener.target.strong_count() > 0);
        listeners.push(Listener { id, target });
        Registration { token: self, id }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Unregisters a listener on drop
///
/// Must be dropped after the target's lock guard.
pub(crate) struct Registration<'a> {
    token: &'a CancellationToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.token
            .inner
            .listeners
            .lock()
            .retain(|listener| listener.id != id);
    }
}

/// Cancels its token when dropped during a panic
pub(crate) struct CancelOnPanic {
    token: CancellationToken,
}

impl Drop for CancelOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            debug!("thread panicked, cancelling token");
            self.token.cancel();
        }
    }
}
