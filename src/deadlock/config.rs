/*!
 * Deadlock Harness Configuration
 *
 * Runtime configuration for the lock-ordering scenario
 */

use crate::core::limits::{DEFAULT_DEADLOCK_HOLD, DEFAULT_DEADLOCK_WINDOW};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Order in which the two harness threads take their locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockOrder {
    /// Each thread locks its own resource, then the other's (circular wait)
    Opposite,
    /// Both threads lock the lower-ranked resource first (no cycle possible)
    Consistent,
}

/// Deadlock harness configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlockConfig {
    /// How long each thread holds its first lock before reaching for the second
    pub hold: Duration,
    /// How long the harness waits for both threads before calling it a deadlock
    pub window: Duration,
    pub order: LockOrder,
}

impl Default for DeadlockConfig {
    fn default() -> Self {
        Self::reproducing()
    }
}

impl DeadlockConfig {
    /// Opposite lock order with a hold long enough to always deadlock
    pub const fn reproducing() -> Self {
        Self {
            hold: DEFAULT_DEADLOCK_HOLD,
            window: DEFAULT_DEADLOCK_WINDOW,
            order: LockOrder::Opposite,
        }
    }

    /// Same timing, but with a global lock order; always completes
    pub const fn ordered() -> Self {
        Self {
            hold: DEFAULT_DEADLOCK_HOLD,
            window: DEFAULT_DEADLOCK_WINDOW,
            order: LockOrder::Consistent,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}
