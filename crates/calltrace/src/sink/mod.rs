//! Destinations for finished traces.
//!
//! Interceptors hand every finished [`StatementTrace`] and [`CallRecord`] to a
//! [`TraceSink`]. The default sink, [`TracingSink`], turns them into `tracing`
//! events; [`StatsSink`] aggregates counters; [`CompositeSink`] fans out.
//!
//! # Example
//!
//! ```rust,ignore
//! use calltrace::{CompositeSink, StatementTraceInterceptor, StatsSink, TracingSink};
//! use std::sync::Arc;
//!
//! let stats = Arc::new(StatsSink::new());
//! let interceptor = StatementTraceInterceptor::new()
//!     .with_sink(CompositeSink::new().add(TracingSink::new()).add_arc(stats.clone()));
//! ```

mod sinks;
mod tracing_sink;

#[cfg(test)]
mod tests;

use crate::call::CallRecord;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tracing::Level;

pub use sinks::{CompositeSink, NoopSink, StatsSink, TraceStats};
pub use tracing_sink::TracingSink;

/// `tracing` target for statement events.
pub const STATEMENT_TARGET: &str = "calltrace::statement";
/// `tracing` target for call events.
pub const CALL_TARGET: &str = "calltrace::call";

/// Which interceptor a trace comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Statement,
    Call,
}

impl TraceKind {
    /// The `tracing` target events of this kind are emitted under.
    pub fn target(self) -> &'static str {
        match self {
            TraceKind::Statement => STATEMENT_TARGET,
            TraceKind::Call => CALL_TARGET,
        }
    }

    /// Whether the current `tracing` subscriber would record an event of this
    /// kind at `level`.
    pub fn tracing_enabled(self, level: Level) -> bool {
        macro_rules! enabled_at_level {
            ($target:expr, $level:expr) => {
                if $level == Level::ERROR {
                    tracing::enabled!(target: $target, Level::ERROR)
                } else if $level == Level::WARN {
                    tracing::enabled!(target: $target, Level::WARN)
                } else if $level == Level::INFO {
                    tracing::enabled!(target: $target, Level::INFO)
                } else if $level == Level::DEBUG {
                    tracing::enabled!(target: $target, Level::DEBUG)
                } else {
                    tracing::enabled!(target: $target, Level::TRACE)
                }
            };
        }

        match self {
            TraceKind::Statement => enabled_at_level!(STATEMENT_TARGET, level),
            TraceKind::Call => enabled_at_level!(CALL_TARGET, level),
        }
    }
}

/// A reconstructed statement and how long it took.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTrace {
    /// The literal statement, whitespace-normalized.
    pub sql: String,
    /// Wall-clock time around the intercepted execution.
    pub elapsed: Duration,
}

impl StatementTrace {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Receives finished traces.
///
/// Implement this trait to route traces to logs, metrics or tests.
pub trait TraceSink: Send + Sync {
    /// Whether traces of `kind` at `level` would be recorded.
    ///
    /// Interceptors ask this before doing any reconstruction work; answering
    /// `false` makes them pure pass-through. Defaults to the `tracing`
    /// subscriber's answer.
    fn enabled(&self, kind: TraceKind, level: Level) -> bool {
        kind.tracing_enabled(level)
    }

    /// Called once per traced statement.
    fn on_statement(&self, _level: Level, _trace: &StatementTrace) {}

    /// Called after [`on_statement`](Self::on_statement) when the statement
    /// exceeded the configured slow threshold.
    fn on_slow_statement(&self, _trace: &StatementTrace, _threshold: Duration) {}

    /// Called once per traced handler call.
    fn on_call(&self, _level: Level, _record: &CallRecord) {}
}

/// Run trace work, discarding a panic so it never reaches the intercepted caller.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Option<R> {
    catch_unwind(AssertUnwindSafe(f)).ok()
}
