/*!
 * Lock-Ordering Deadlock Demo
 *
 * A negative fixture: two resources, each behind its own mutex, locked in
 * opposite order by two threads. The resulting circular wait is what the
 * exchange rules out by construction (one mutex per exchange, never a
 * second lock acquired while the first is held).
 *
 * `LockOrder::Consistent` runs the same workload with a global lock order
 * and always completes.
 */

mod config;
mod harness;
mod resource;

pub use config::{DeadlockConfig, LockOrder};
pub use harness::{DeadlockDemo, DeadlockOutcome};
pub use resource::Resource;
