/*!
 * Limits and Constants
 *
 * Centralized defaults for the exchange demos and the deadlock harness.
 * Grouped by domain so tuning a scenario never means hunting through modules.
 */

use std::time::Duration;

// =============================================================================
// DEADLOCK HARNESS
// =============================================================================

/// Time each harness thread holds its own lock before reaching for the other (100ms)
/// Wide enough that both threads are guaranteed to own their first lock
pub const DEFAULT_DEADLOCK_HOLD: Duration = Duration::from_millis(100);

/// Wall-clock window in which the harness waits for both threads to finish (2s)
/// A run with no completion inside this window is reported as deadlocked
pub const DEFAULT_DEADLOCK_WINDOW: Duration = Duration::from_secs(2);

// =============================================================================
// LEDGER DEMO
// =============================================================================

/// Number of depositing threads feeding the account
pub const DEFAULT_LEDGER_PRODUCERS: usize = 2;

/// Transactions submitted by each depositing thread
pub const DEFAULT_LEDGER_ITEMS: usize = 50;

/// Upper bound on depositing threads; each one is a real OS thread
pub const MAX_LEDGER_PRODUCERS: usize = 64;

/// Upper bound on transactions in one ledger run (producers x items)
pub const MAX_LEDGER_TOTAL_ITEMS: usize = 1_000_000;

/// Base amount for generated transactions (in minor currency units)
pub const LEDGER_AMOUNT_UNIT: u64 = 10;

/// Every N-th generated transaction is a debit instead of a credit
pub const LEDGER_DEBIT_EVERY: usize = 3;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Enables JSON log output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "EXCHANGE_TRACE_JSON";

/// Overrides [`DEFAULT_LEDGER_PRODUCERS`]
pub const ENV_PRODUCERS: &str = "EXCHANGE_PRODUCERS";

/// Overrides [`DEFAULT_LEDGER_ITEMS`]
pub const ENV_ITEMS: &str = "EXCHANGE_ITEMS";

/// Runs the deadlock harness after the ledger demo when set to `1` or `true`
pub const ENV_RUN_DEADLOCK: &str = "EXCHANGE_RUN_DEADLOCK";
