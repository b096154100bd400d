/*!
 * Exchange Statistics
 */

use crate::core::types::{InstanceId, SlotState};
use serde::{Deserialize, Serialize};

/// Point-in-time view of an exchange, taken under its mutex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStats {
    pub id: InstanceId,
    pub state: SlotState,
    /// Completed deposits since creation
    pub deposits: u64,
    /// Completed withdrawals since creation
    pub withdrawals: u64,
    /// Depositors currently parked on a full slot
    pub waiting_depositors: usize,
    /// Withdrawers currently parked on an empty slot
    pub waiting_withdrawers: usize,
}

impl ExchangeStats {
    /// Deposits not yet withdrawn: always 0 or 1
    #[inline]
    pub fn in_flight(&self) -> u64 {
        self.deposits.saturating_sub(self.withdrawals)
    }

    /// Whether the counters agree with the occupancy they were read alongside
    pub fn is_consistent(&self) -> bool {
        self.withdrawals <= self.deposits
            && self.in_flight() <= 1
            && self.state.is_full() == (self.in_flight() == 1)
    }

    pub fn waiting(&self) -> usize {
        self.waiting_depositors + self.waiting_withdrawers
    }
}
