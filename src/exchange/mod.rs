/*!
 * Exchange
 *
 * Blocking single-slot handoff between producer and consumer threads.
 *
 * # Operations
 *
 * - `deposit` / `withdraw`: park until the slot is empty / full
 * - `try_deposit` / `try_withdraw`: never park
 * - `deposit_timeout` / `withdraw_timeout`: park for a bounded time
 * - `deposit_cancellable` / `withdraw_cancellable`: park until a token fires
 *
 * Business rules (balances, quotas) belong to callers layered on top; the
 * exchange only knows "empty" and "full".
 */

mod slot;
mod stats;

pub use slot::Exchange;
pub use stats::ExchangeStats;
