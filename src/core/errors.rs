/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{Millis, SlotState};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for fallible exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Reasons a bounded or cancellable exchange operation gave up
///
/// The plain blocking `deposit`/`withdraw` never produce one of these: they
/// wait for as long as it takes.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ExchangeError {
    #[error("Wait was cancelled")]
    #[diagnostic(
        code(exchange::cancelled),
        help("The caller's cancellation token fired while it was parked. Retry with a fresh token if the work is still wanted.")
    )]
    Cancelled,

    #[error("Operation timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    #[diagnostic(
        code(exchange::timeout),
        help("No counterpart arrived in time. Check that a producer or consumer is still running.")
    )]
    Timeout { elapsed_ms: Millis, timeout_ms: Millis },

    #[error("Would block: slot is {0}")]
    #[diagnostic(
        code(exchange::would_block),
        help("Use the blocking or bounded-wait variant to wait for the slot to change state.")
    )]
    WouldBlock(SlotState),
}

impl ExchangeError {
    /// Whether retrying the same operation later could succeed
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Timeout { .. } | ExchangeError::WouldBlock(_))
    }
}

/// A deposit that did not happen, handing the item back to the caller
///
/// Failed deposits never drop the payload: it travels back inside the error
/// so the caller can retry or route it elsewhere.
#[derive(Error)]
#[error("{error}")]
pub struct Rejected<T> {
    #[source]
    error: ExchangeError,
    item: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(error: ExchangeError, item: T) -> Self {
        Self { error, item }
    }

    /// Why the deposit failed
    #[inline]
    pub fn error(&self) -> ExchangeError {
        self.error
    }

    /// Recover the undelivered item
    #[inline]
    pub fn into_inner(self) -> T {
        self.item
    }

    pub fn into_parts(self) -> (ExchangeError, T) {
        (self.error, self.item)
    }
}

// Payloads are not required to be Debug
impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> From<Rejected<T>> for ExchangeError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}

/// Failures of the thread-spawning harnesses (deadlock demo, ledger demo)
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HarnessError {
    #[error("Failed to spawn thread {thread}: {reason}")]
    #[diagnostic(
        code(harness::spawn_failed),
        help("Check system thread limits. View logs for details.")
    )]
    SpawnFailed { thread: String, reason: String },

    #[error("Thread {thread} panicked")]
    #[diagnostic(code(harness::panicked))]
    Panicked { thread: String },
}

impl HarnessError {
    pub(crate) fn spawn(thread: impl Into<String>, err: std::io::Error) -> Self {
        HarnessError::SpawnFailed {
            thread: thread.into(),
            reason: err.to_string(),
        }
    }
}
