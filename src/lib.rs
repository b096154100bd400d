/*!
 * Slot Exchange Library
 * Single-slot blocking handoff plus a lock-ordering deadlock harness
 */

pub mod core;
pub mod deadlock;
pub mod demo;
pub mod exchange;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{ExchangeError, ExchangeResult, HarnessError, Rejected};
pub use crate::core::sync::{CancellationToken, WakeResult};
pub use crate::core::types::SlotState;
pub use deadlock::{DeadlockConfig, DeadlockDemo, DeadlockOutcome, LockOrder};
pub use exchange::{Exchange, ExchangeStats};
pub use monitoring::init_tracing;
