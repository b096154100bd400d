/*!
 * Demos
 * Callers layered on the exchange, driven by the `exchange-demo` binary
 */

mod config;
mod ledger;

pub use config::DemoConfig;
pub(crate) use config::is_enabled;
pub use ledger::{run_ledger, Account, LedgerError, LedgerReport, Transaction};
