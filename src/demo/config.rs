/*!
 * Demo Configuration
 *
 * Environment variables:
 * - EXCHANGE_PRODUCERS: depositing threads (default: 2, max: 64)
 * - EXCHANGE_ITEMS: transactions per depositing thread (default: 50)
 *
 * A producer count above the limit, or a product of the two above
 * `MAX_LEDGER_TOTAL_ITEMS`, falls back to the defaults.
 * - EXCHANGE_RUN_DEADLOCK: also run the deadlock harness (default: false)
 */

use crate::core::limits::{
    DEFAULT_LEDGER_ITEMS, DEFAULT_LEDGER_PRODUCERS, ENV_ITEMS, ENV_PRODUCERS, ENV_RUN_DEADLOCK,
    MAX_LEDGER_PRODUCERS, MAX_LEDGER_TOTAL_ITEMS,
};
use crate::deadlock::DeadlockConfig;
use tracing::warn;

/// Configuration for the `exchange-demo` binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub producers: usize,
    pub items_per_producer: usize,
    pub run_deadlock: bool,
    pub deadlock: DeadlockConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            producers: DEFAULT_LEDGER_PRODUCERS,
            items_per_producer: DEFAULT_LEDGER_ITEMS,
            run_deadlock: false,
            deadlock: DeadlockConfig::reproducing(),
        }
    }
}

impl DemoConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    ///
    /// Invalid values are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut producers = lookup(ENV_PRODUCERS)
            .and_then(|raw| parse_count(ENV_PRODUCERS, &raw))
            .unwrap_or(defaults.producers);
        let mut items_per_producer = lookup(ENV_ITEMS)
            .and_then(|raw| parse_count(ENV_ITEMS, &raw))
            .unwrap_or(defaults.items_per_producer);

        if producers > MAX_LEDGER_PRODUCERS {
            warn!(
                key = ENV_PRODUCERS,
                value = producers,
                max = MAX_LEDGER_PRODUCERS,
                "too many producers, using default"
            );
            producers = defaults.producers;
        }

        let within_bound = producers
            .checked_mul(items_per_producer)
            .is_some_and(|total| total <= MAX_LEDGER_TOTAL_ITEMS);
        if !within_bound {
            warn!(
                producers,
                items_per_producer,
                max = MAX_LEDGER_TOTAL_ITEMS,
                "ledger run too large, using defaults"
            );
            producers = defaults.producers;
            items_per_producer = defaults.items_per_producer;
        }

        Self {
            producers,
            items_per_producer,
            run_deadlock: lookup(ENV_RUN_DEADLOCK)
                .map(|raw| is_enabled(&raw))
                .unwrap_or(defaults.run_deadlock),
            deadlock: defaults.deadlock,
        }
    }

    /// Transactions the account will process in one ledger run
    ///
    /// Saturates for hand-built configs that were never bounded.
    #[inline]
    pub fn total_items(&self) -> usize {
        self.producers.saturating_mul(self.items_per_producer)
    }
}

fn parse_count(key: &str, raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => {
            warn!(key, value = raw, "must be at least 1, using default");
            None
        }
        Ok(count) => Some(count),
        Err(e) => {
            warn!(key, value = raw, error = %e, "not a number, using default");
            None
        }
    }
}

pub(crate) fn is_enabled(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "1" || raw.eq_ignore_ascii_case("true")
}
