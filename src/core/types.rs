/*!
 * Core Types
 * Common types shared by the exchange, the harness, and the demos
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier attached to every exchange and harness run in log output
pub type InstanceId = Uuid;

/// Milliseconds, as reported in errors and outcomes
pub type Millis = u64;

/// Occupancy of a single-slot exchange
///
/// The only two states an exchange can be in. There is no terminal state:
/// the slot flips between them for as long as its owner keeps it alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Empty,
    Full,
}

impl SlotState {
    #[inline]
    pub fn is_full(self) -> bool {
        matches!(self, SlotState::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotState::Empty => "empty",
            SlotState::Full => "full",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert an elapsed duration to whole milliseconds, saturating
#[inline]
pub fn as_millis(duration: std::time::Duration) -> Millis {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
