/*!
 * Deadlock Harness
 *
 * Runs two threads against two resources and reports whether both finish
 * inside the observation window. With `LockOrder::Opposite` they never do:
 * each thread owns one lock and waits forever for the other's.
 *
 * Threads are detached. After a deadlocked run they stay parked for the
 * rest of the process lifetime; there is no way to unwind a thread blocked
 * on a mutex, which is the point of the demonstration.
 */

use super::config::{DeadlockConfig, LockOrder};
use super::resource::Resource;
use crate::core::errors::HarnessError;
use crate::core::types::{as_millis, InstanceId, Millis};
use flume::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// What the harness observed before its window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeadlockOutcome {
    /// Both threads returned from their second lock acquisition
    Completed { elapsed_ms: Millis },
    /// The window closed with fewer than two threads finished
    Deadlocked { completed: usize, window_ms: Millis },
    /// A thread died without reporting, most likely a panic
    Aborted { completed: usize },
}

impl DeadlockOutcome {
    #[inline]
    pub fn is_deadlocked(&self) -> bool {
        matches!(self, DeadlockOutcome::Deadlocked { .. })
    }

    /// Threads that reported completion
    pub fn completed(&self) -> usize {
        match self {
            DeadlockOutcome::Completed { .. } => 2,
            DeadlockOutcome::Deadlocked { completed, .. }
            | DeadlockOutcome::Aborted { completed } => *completed,
        }
    }
}

/// Two-thread, two-resource lock-ordering scenario
///
/// # Examples
///
/// ```no_run
/// use slot_exchange::deadlock::{DeadlockConfig, DeadlockDemo};
///
/// let outcome = DeadlockDemo::new(DeadlockConfig::reproducing()).run().unwrap();
/// assert!(outcome.is_deadlocked());
/// ```
pub struct DeadlockDemo {
    run_id: InstanceId,
    config: DeadlockConfig,
    r1: Arc<Resource>,
    r2: Arc<Resource>,
}

impl DeadlockDemo {
    pub fn new(config: DeadlockConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            r1: Arc::new(Resource::new("r1", 1)),
            r2: Arc::new(Resource::new("r2", 2)),
        }
    }

    #[inline]
    pub fn run_id(&self) -> InstanceId {
        self.run_id
    }

    /// Handles to the two resources, for inspecting them after a run
    pub fn resources(&self) -> (Arc<Resource>, Arc<Resource>) {
        (self.r1.clone(), self.r2.clone())
    }

    /// Start thread A on `r1.f(r2)` and thread B on `r2.f(r1)`, then watch
    ///
    /// Consumes the demo: after a deadlocked run its resources are locked
    /// for good and cannot be reused.
    pub fn run(self) -> Result<DeadlockOutcome, HarnessError> {
        info!(
            run_id = %self.run_id,
            order = ?self.config.order,
            hold_ms = as_millis(self.config.hold),
            window_ms = as_millis(self.config.window),
            "starting deadlock harness"
        );

        let (done_tx, done_rx) = flume::bounded(2);
        // Both threads wait for a start signal. If the second spawn fails,
        // the sender is dropped and the first thread exits without locking.
        let (start_tx, start_rx) = flume::bounded(2);

        self.spawn("deadlock-a", &self.r1, &self.r2, &done_tx, &start_rx)?;
        self.spawn("deadlock-b", &self.r2, &self.r1, &done_tx, &start_rx)?;
        drop(done_tx);
        for _ in 0..2 {
            // A thread that already died is reported below as Aborted
            let _ = start_tx.send(());
        }

        let started = Instant::now();
        let deadline = started.checked_add(self.config.window);
        let mut completed = 0;

        while completed < 2 {
            let received = match deadline {
                Some(deadline) => done_rx.recv_deadline(deadline),
                None => done_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(thread_name) => {
                    completed += 1;
                    info!(run_id = %self.run_id, thread = thread_name, "harness thread finished");
                }
                Err(RecvTimeoutError::Timeout) => {
                    let outcome = DeadlockOutcome::Deadlocked {
                        completed,
                        window_ms: as_millis(self.config.window),
                    };
                    warn!(
                        run_id = %self.run_id,
                        completed,
                        "no progress inside observation window, threads are deadlocked"
                    );
                    return Ok(outcome);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(run_id = %self.run_id, completed, "harness thread exited without reporting");
                    return Ok(DeadlockOutcome::Aborted { completed });
                }
            }
        }

        let elapsed_ms = as_millis(started.elapsed());
        info!(run_id = %self.run_id, elapsed_ms, "both harness threads completed");
        Ok(DeadlockOutcome::Completed { elapsed_ms })
    }

    fn spawn(
        &self,
        name: &'static str,
        own: &Arc<Resource>,
        other: &Arc<Resource>,
        done: &Sender<&'static str>,
        start: &Receiver<()>,
    ) -> Result<(), HarnessError> {
        let own = own.clone();
        let other = other.clone();
        let done = done.clone();
        let start = start.clone();
        let DeadlockConfig { hold, order, .. } = self.config;

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if start.recv().is_err() {
                    return;
                }
                match order {
                    LockOrder::Opposite => own.f(&other, hold),
                    LockOrder::Consistent => own.f_ordered(&other, hold),
                };
                // The receiver may have given up already
                let _ = done.send(name);
            })
            .map_err(|e| HarnessError::spawn(name, e))?;

        Ok(())
    }
}

impl std::fmt::Debug for DeadlockDemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlockDemo")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
