/*!
 * Monitoring
 * Structured tracing setup and phase timing
 */

mod tracer;

pub use tracer::{init_test_tracing, init_tracing, PhaseSpan};
