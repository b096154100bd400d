/*!
 * Single-Slot Exchange
 *
 * A capacity-1 handoff between producer and consumer threads.
 *
 * # Design: One Mutex, Two Condvars
 *
 * The slot, its counters, and the waiter tallies all live behind a single
 * `parking_lot::Mutex`. Both condition variables (`not_empty` for
 * withdrawers, `not_full` for depositors) are only ever waited on with that
 * mutex, so an operation never holds one lock while reaching for another.
 *
 * Every transition broadcasts to all waiters of the opposite role and every
 * waiter re-checks its predicate in a loop after waking. Spurious wakeups
 * and same-role competitors simply park again.
 */

use super::stats::ExchangeStats;
use crate::core::errors::{ExchangeError, ExchangeResult, Rejected};
use crate::core::sync::{CancellationToken, Wake, WakeResult};
use crate::core::types::{as_millis, InstanceId, SlotState};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

/// Slot contents plus bookkeeping, all guarded by the one mutex
struct Slot<T> {
    value: Option<T>,
    deposits: u64,
    withdrawals: u64,
    waiting_depositors: usize,
    waiting_withdrawers: usize,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            value: None,
            deposits: 0,
            withdrawals: 0,
            waiting_depositors: 0,
            waiting_withdrawers: 0,
        }
    }

    #[inline]
    fn state(&self) -> SlotState {
        if self.value.is_some() {
            SlotState::Full
        } else {
            SlotState::Empty
        }
    }

    #[inline]
    fn enter(&mut self, role: Role) {
        match role {
            Role::Depositor => self.waiting_depositors += 1,
            Role::Withdrawer => self.waiting_withdrawers += 1,
        }
    }

    #[inline]
    fn leave(&mut self, role: Role) {
        match role {
            Role::Depositor => self.waiting_depositors -= 1,
            Role::Withdrawer => self.waiting_withdrawers -= 1,
        }
    }
}

struct Shared<T> {
    id: InstanceId,
    slot: Mutex<Slot<T>>,
    /// Withdrawers park here until the slot becomes full
    not_empty: Condvar,
    /// Depositors park here until the slot becomes empty
    not_full: Condvar,
}

impl<T: Send> Wake for Shared<T> {
    fn wake(&self) -> WakeResult {
        // Taking the mutex orders this wake after any waiter that already
        // checked its token but has not parked yet
        let _slot = self.slot.lock();
        let woken = self.not_empty.notify_all() + self.not_full.notify_all();
        WakeResult::from_count(woken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Depositor,
    Withdrawer,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Depositor => "deposit",
            Role::Withdrawer => "withdraw",
        }
    }
}

/// Why a bounded or cancellable wait stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Expired,
}

/// Exit conditions for a park loop beyond "predicate became true"
#[derive(Clone, Copy)]
struct Wait<'a> {
    started: Instant,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    token: Option<&'a CancellationToken>,
}

impl<'a> Wait<'a> {
    fn timeout(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            timeout: Some(timeout),
            // A deadline past the end of time is no deadline
            deadline: started.checked_add(timeout),
            token: None,
        }
    }

    fn cancellable(token: &'a CancellationToken) -> Self {
        Self {
            started: Instant::now(),
            timeout: None,
            deadline: None,
            token: Some(token),
        }
    }

    fn error_for(self, interrupt: Interrupt) -> ExchangeError {
        match interrupt {
            Interrupt::Cancelled => ExchangeError::Cancelled,
            Interrupt::Expired => ExchangeError::Timeout {
                elapsed_ms: as_millis(self.started.elapsed()),
                timeout_ms: self.timeout.map(as_millis).unwrap_or(u64::MAX),
            },
        }
    }
}

/// Single-slot synchronized exchange
///
/// `deposit` blocks while the slot is full, `withdraw` blocks while it is
/// empty, so successful operations strictly alternate: the N-th withdraw
/// returns exactly the N-th deposited item.
///
/// The exchange is `Send + Sync` whenever `T: Send`. Share it between
/// threads with `Arc<Exchange<T>>`.
///
/// # Examples
///
/// ```
/// use slot_exchange::Exchange;
/// use std::sync::Arc;
/// use std::thread;
///
/// let exchange = Arc::new(Exchange::new());
/// let consumer = {
///     let exchange = exchange.clone();
///     thread::spawn(move || exchange.withdraw())
/// };
///
/// exchange.deposit("x");
/// assert_eq!(consumer.join().unwrap(), "x");
/// ```
pub struct Exchange<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send> Exchange<T> {
    /// Create an empty exchange
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                slot: Mutex::new(Slot::new()),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    /// Identifier used in this exchange's log events
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    /// Place `item` in the slot, blocking while the slot is full
    pub fn deposit(&self, item: T) {
        let mut slot = self.shared.slot.lock();

        while slot.value.is_some() {
            debug!(exchange = %self.shared.id, "deposit parked, slot full");
            slot.enter(Role::Depositor);
            self.shared.not_full.wait(&mut slot);
            slot.leave(Role::Depositor);
        }

        self.store(&mut slot, item);
    }

    /// Take the item out of the slot, blocking while the slot is empty
    pub fn withdraw(&self) -> T {
        let mut slot = self.shared.slot.lock();

        loop {
            if let Some(item) = self.take(&mut slot) {
                return item;
            }

            debug!(exchange = %self.shared.id, "withdraw parked, slot empty");
            slot.enter(Role::Withdrawer);
            self.shared.not_empty.wait(&mut slot);
            slot.leave(Role::Withdrawer);
        }
    }

    /// Deposit without blocking
    ///
    /// Fails with [`ExchangeError::WouldBlock`] when the slot is full,
    /// handing `item` back.
    pub fn try_deposit(&self, item: T) -> Result<(), Rejected<T>> {
        let mut slot = self.shared.slot.lock();
        if slot.value.is_some() {
            return Err(Rejected::new(ExchangeError::WouldBlock(SlotState::Full), item));
        }
        self.store(&mut slot, item);
        Ok(())
    }

    /// Withdraw without blocking
    ///
    /// Fails with [`ExchangeError::WouldBlock`] when the slot is empty.
    pub fn try_withdraw(&self) -> ExchangeResult<T> {
        let mut slot = self.shared.slot.lock();
        self.take(&mut slot)
            .ok_or(ExchangeError::WouldBlock(SlotState::Empty))
    }

    /// Deposit, waiting at most `timeout` for the slot to empty
    pub fn deposit_timeout(&self, item: T, timeout: Duration) -> Result<(), Rejected<T>> {
        let wait = Wait::timeout(timeout);
        self.deposit_with(item, wait)
            .map_err(|(interrupt, item)| Rejected::new(wait.error_for(interrupt), item))
    }

    /// Withdraw, waiting at most `timeout` for the slot to fill
    pub fn withdraw_timeout(&self, timeout: Duration) -> ExchangeResult<T> {
        let wait = Wait::timeout(timeout);
        self.withdraw_with(wait)
            .map_err(|interrupt| wait.error_for(interrupt))
    }

    /// Current occupancy
    ///
    /// Takes the mutex briefly. Succeeds promptly even while other callers
    /// are parked, since parked callers do not hold the lock.
    pub fn state(&self) -> SlotState {
        self.shared.slot.lock().state()
    }

    /// Consistent snapshot of counters and occupancy
    ///
    /// All fields are read under one acquisition of the mutex, so they
    /// never tear against a concurrent transition.
    pub fn stats(&self) -> ExchangeStats {
        let slot = self.shared.slot.lock();
        ExchangeStats {
            id: self.shared.id,
            state: slot.state(),
            deposits: slot.deposits,
            withdrawals: slot.withdrawals,
            waiting_depositors: slot.waiting_depositors,
            waiting_withdrawers: slot.waiting_withdrawers,
        }
    }

    /// Write into an empty slot and wake withdrawers
    fn store(&self, slot: &mut MutexGuard<'_, Slot<T>>, item: T) {
        debug_assert!(slot.value.is_none(), "deposit would overwrite a full slot");
        slot.value = Some(item);
        slot.deposits += 1;

        let woken = self.shared.not_empty.notify_all();
        trace!(
            exchange = %self.shared.id,
            op = Role::Depositor.as_str(),
            seq = slot.deposits,
            woken,
            "slot filled"
        );
    }

    /// Empty a full slot and wake depositors
    fn take(&self, slot: &mut MutexGuard<'_, Slot<T>>) -> Option<T> {
        let item = slot.value.take()?;
        slot.withdrawals += 1;

        let woken = self.shared.not_full.notify_all();
        trace!(
            exchange = %self.shared.id,
            op = Role::Withdrawer.as_str(),
            seq = slot.withdrawals,
            woken,
            "slot emptied"
        );
        Some(item)
    }

    fn deposit_with(&self, item: T, wait: Wait<'_>) -> Result<(), (Interrupt, T)> {
        let mut slot = self.shared.slot.lock();

        loop {
            if slot.value.is_none() {
                self.store(&mut slot, item);
                return Ok(());
            }

            if let Err(interrupt) = self.park(&mut slot, Role::Depositor, &wait) {
                return Err((interrupt, item));
            }
        }
    }

    fn withdraw_with(&self, wait: Wait<'_>) -> Result<T, Interrupt> {
        let mut slot = self.shared.slot.lock();

        loop {
            if let Some(item) = self.take(&mut slot) {
                return Ok(item);
            }

            self.park(&mut slot, Role::Withdrawer, &wait)?;
        }
    }

    /// Park once on the condvar for `role`, or report why not
    ///
    /// Returns `Ok` after any wakeup, including a timed-out one, so the
    /// caller re-checks its predicate before the deadline is judged.
    /// On `Err` the guard is still held and is released when the caller
    /// drops it on its way out.
    fn park(
        &self,
        slot: &mut MutexGuard<'_, Slot<T>>,
        role: Role,
        wait: &Wait<'_>,
    ) -> Result<(), Interrupt> {
        if wait.token.is_some_and(CancellationToken::is_cancelled) {
            debug!(exchange = %self.shared.id, op = role.as_str(), "wait cancelled");
            return Err(Interrupt::Cancelled);
        }
        if wait.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!(exchange = %self.shared.id, op = role.as_str(), "wait timed out");
            return Err(Interrupt::Expired);
        }

        let condvar = match role {
            Role::Depositor => &self.shared.not_full,
            Role::Withdrawer => &self.shared.not_empty,
        };

        slot.enter(role);
        match wait.deadline {
            Some(deadline) => {
                condvar.wait_until(slot, deadline);
            }
            None => condvar.wait(slot),
        }
        slot.leave(role);

        Ok(())
    }
}

impl<T: Send + 'static> Exchange<T> {
    /// Deposit, parking until the slot empties or `token` is cancelled
    ///
    /// A token that is already cancelled only fails the call if it would
    /// have to wait.
    pub fn deposit_cancellable(&self, item: T, token: &CancellationToken) -> Result<(), Rejected<T>> {
        // Registered before the slot mutex is taken, unregistered after it is released
        let _registration = token.register(self.listener());
        let wait = Wait::cancellable(token);
        self.deposit_with(item, wait)
            .map_err(|(interrupt, item)| Rejected::new(wait.error_for(interrupt), item))
    }

    /// Withdraw, parking until the slot fills or `token` is cancelled
    pub fn withdraw_cancellable(&self, token: &CancellationToken) -> ExchangeResult<T> {
        let _registration = token.register(self.listener());
        let wait = Wait::cancellable(token);
        self.withdraw_with(wait)
            .map_err(|interrupt| wait.error_for(interrupt))
    }

    fn listener(&self) -> Weak<dyn Wake> {
        Arc::downgrade(&self.shared) as Weak<dyn Wake>
    }
}

impl<T: Send> Default for Exchange<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Exchange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Exchange");
        debug.field("id", &self.shared.id);
        // Never block inside a formatter
        match self.shared.slot.try_lock() {
            Some(slot) => debug.field("state", &slot.state()),
            None => debug.field("state", &"<locked>"),
        };
        debug.finish()
    }
}
