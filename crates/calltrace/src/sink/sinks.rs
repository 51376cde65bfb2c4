use super::{StatementTrace, TraceKind, TraceSink};
use crate::call::CallRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::Level;

/// A sink that records nothing and reports every level as disabled.
///
/// Interceptors using it never reconstruct or serialize anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn enabled(&self, _kind: TraceKind, _level: Level) -> bool {
        false
    }
}

/// A sink that aggregates counters.
///
/// Reports every level as enabled, so pairing it with an interceptor always
/// pays the reconstruction cost.
#[derive(Debug, Default)]
pub struct StatsSink {
    statements: AtomicU64,
    slow_statements: AtomicU64,
    total_statement_nanos: AtomicU64,
    max_statement_nanos: AtomicU64,
    slowest_statement: std::sync::Mutex<Option<String>>,
    calls: AtomicU64,
    failed_calls: AtomicU64,
    total_call_millis: AtomicU64,
}

/// Snapshot of [`StatsSink`] counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceStats {
    /// Statements traced.
    pub statements: u64,
    /// Statements reported slow.
    pub slow_statements: u64,
    /// Total statement execution time.
    pub total_statement_duration: Duration,
    /// Slowest statement duration.
    pub max_statement_duration: Duration,
    /// Slowest statement text.
    pub slowest_statement: Option<String>,
    /// Handler calls recorded.
    pub calls: u64,
    /// Handler calls recorded with a failure.
    pub failed_calls: u64,
    /// Total handler call time.
    pub total_call_duration: Duration,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> TraceStats {
        TraceStats {
            statements: self.statements.load(Ordering::Relaxed),
            slow_statements: self.slow_statements.load(Ordering::Relaxed),
            total_statement_duration: Duration::from_nanos(
                self.total_statement_nanos.load(Ordering::Relaxed),
            ),
            max_statement_duration: Duration::from_nanos(
                self.max_statement_nanos.load(Ordering::Relaxed),
            ),
            slowest_statement: self
                .slowest_statement
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default(),
            calls: self.calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            total_call_duration: Duration::from_millis(
                self.total_call_millis.load(Ordering::Relaxed),
            ),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.statements.store(0, Ordering::Relaxed);
        self.slow_statements.store(0, Ordering::Relaxed);
        self.total_statement_nanos.store(0, Ordering::Relaxed);
        self.max_statement_nanos.store(0, Ordering::Relaxed);
        if let Ok(mut slowest) = self.slowest_statement.lock() {
            *slowest = None;
        }
        self.calls.store(0, Ordering::Relaxed);
        self.failed_calls.store(0, Ordering::Relaxed);
        self.total_call_millis.store(0, Ordering::Relaxed);
    }
}

fn saturating_add(counter: &AtomicU64, value: u64) {
    let prev = counter.fetch_add(value, Ordering::Relaxed);
    if prev.checked_add(value).is_none() {
        counter.store(u64::MAX, Ordering::Relaxed);
    }
}

impl TraceSink for StatsSink {
    fn enabled(&self, _kind: TraceKind, _level: Level) -> bool {
        true
    }

    fn on_statement(&self, _level: Level, trace: &StatementTrace) {
        let nanos = u64::try_from(trace.elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.statements.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_statement_nanos, nanos);

        // Only the thread that raises the max records its statement.
        let mut current_max = self.max_statement_nanos.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max_statement_nanos.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    if let Ok(mut slowest) = self.slowest_statement.lock() {
                        *slowest = Some(trace.sql.clone());
                    }
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn on_slow_statement(&self, _trace: &StatementTrace, _threshold: Duration) {
        self.slow_statements.fetch_add(1, Ordering::Relaxed);
    }

    fn on_call(&self, _level: Level, record: &CallRecord) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if record.failure.is_some() {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }
        saturating_add(&self.total_call_millis, record.elapsed_ms);
    }
}

/// A sink that delegates to several sinks.
///
/// A kind/level is enabled when any inner sink has it enabled; every inner sink
/// then receives the trace.
pub struct CompositeSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl CompositeSink {
    /// Create an empty composite sink.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink.
    #[allow(clippy::should_implement_trait)]
    pub fn add<S: TraceSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Add an Arc-wrapped sink.
    pub fn add_arc(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for CompositeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for CompositeSink {
    fn enabled(&self, kind: TraceKind, level: Level) -> bool {
        self.sinks.iter().any(|sink| sink.enabled(kind, level))
    }

    fn on_statement(&self, level: Level, trace: &StatementTrace) {
        for sink in &self.sinks {
            sink.on_statement(level, trace);
        }
    }

    fn on_slow_statement(&self, trace: &StatementTrace, threshold: Duration) {
        for sink in &self.sinks {
            sink.on_slow_statement(trace, threshold);
        }
    }

    fn on_call(&self, level: Level, record: &CallRecord) {
        for sink in &self.sinks {
            sink.on_call(level, record);
        }
    }
}
