/*!
 * Structured Tracing
 * Subscriber setup and timed spans for demo phases, using the tracing crate
 *
 * Features:
 * - Human-readable or JSON output selected at startup
 * - Thread names in every event (harness threads are named)
 * - Phase spans that log their own duration on drop
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::core::types::{as_millis, InstanceId};
use std::time::Instant;
use tracing::{debug, info, span, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - EXCHANGE_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| crate::demo::is_enabled(&v))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "structured tracing initialized");
    }
}

/// Compact debug-level subscriber for tests
///
/// Ignores the error when another test already installed one.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
        .try_init();
}

/// Span covering one demo phase, logging its duration when dropped
pub struct PhaseSpan {
    span: tracing::Span,
    start: Instant,
    phase: &'static str,
    trace_id: InstanceId,
}

impl PhaseSpan {
    pub fn new(phase: &'static str) -> Self {
        let trace_id = Uuid::new_v4();
        let span = span!(
            Level::INFO,
            "phase",
            trace_id = %trace_id,
            phase = phase,
            duration_ms = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            phase,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> InstanceId {
        self.trace_id
    }

    /// Enter the span for the current thread
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PhaseSpan {
    fn drop(&mut self) {
        let duration_ms = as_millis(self.start.elapsed());
        self.span.record("duration_ms", duration_ms);

        let _entered = self.span.enter();
        debug!(
            trace_id = %self.trace_id,
            phase = self.phase,
            duration_ms,
            "phase completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_span() {
        init_test_tracing();

        let span = PhaseSpan::new("test_phase");
        let first = span.trace_id();
        {
            let _entered = span.enter();
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_ne!(first, PhaseSpan::new("other").trace_id());
    }

    #[test]
    fn test_init_tracing_twice() {
        init_test_tracing();
        init_tracing();
        init_tracing();
    }
}
