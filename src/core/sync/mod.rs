/*!
 * Synchronization Primitives
 *
 * Wait/notify support shared by the blocking exchange:
 * - Cancellation tokens that wake parked threads
 * - Wake accounting for broadcast notifications
 */

mod cancel;
mod traits;

pub use cancel::CancellationToken;
pub use traits::{Wake, WakeResult};
