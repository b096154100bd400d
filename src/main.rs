/*!
 * Exchange Demo - Main Entry Point
 *
 * Runs the account ledger over a single-slot exchange and, on request,
 * the lock-ordering deadlock harness:
 * - EXCHANGE_PRODUCERS / EXCHANGE_ITEMS size the ledger run
 * - EXCHANGE_RUN_DEADLOCK=1 adds the deadlock harness
 * - EXCHANGE_TRACE_JSON=1 switches logs to JSON
 */

use anyhow::Context;
use tracing::{info, warn};

use slot_exchange::demo::{run_ledger, DemoConfig};
use slot_exchange::monitoring::PhaseSpan;
use slot_exchange::{init_tracing, DeadlockDemo, DeadlockOutcome};

fn main() -> anyhow::Result<()> {
    // Initialize structured tracing
    init_tracing();

    let config = DemoConfig::from_env();
    info!(?config, "exchange demo starting");

    let report = {
        let phase = PhaseSpan::new("ledger");
        let _entered = phase.enter();
        run_ledger(&config).context("ledger demo failed")?
    };

    let rendered = serde_json::to_string(&report).context("failed to render ledger report")?;
    info!(report = %rendered, "ledger report");

    if !config.run_deadlock {
        info!("deadlock harness skipped (set EXCHANGE_RUN_DEADLOCK=1 to run it)");
        return Ok(());
    }

    let outcome = {
        let phase = PhaseSpan::new("deadlock");
        let _entered = phase.enter();
        DeadlockDemo::new(config.deadlock)
            .run()
            .context("deadlock harness failed")?
    };

    match outcome {
        DeadlockOutcome::Deadlocked { window_ms, .. } => {
            // Returning from main ends the process along with the parked threads
            warn!(window_ms, "deadlock reproduced; exiting with harness threads still parked");
        }
        other => warn!(outcome = ?other, "deadlock harness did not reproduce a deadlock"),
    }

    Ok(())
}
