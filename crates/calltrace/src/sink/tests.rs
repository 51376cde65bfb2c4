use super::*;
use crate::call::{CallRecord, CallSite};
use std::sync::Arc;

fn trace(sql: &str, millis: u64) -> StatementTrace {
    StatementTrace {
        sql: sql.to_string(),
        elapsed: Duration::from_millis(millis),
    }
}

fn call(elapsed_ms: u64, failure: Option<&str>) -> CallRecord {
    CallRecord {
        site: CallSite::new("app::Users", "get"),
        request_line: Some("GET /users/1".into()),
        command: None,
        args: Vec::new(),
        result: None,
        elapsed_ms,
        failure: failure.map(str::to_string),
    }
}

#[test]
fn stats_sink_aggregates() {
    let sink = StatsSink::new();
    sink.on_statement(Level::DEBUG, &trace("SELECT 1", 5));
    sink.on_statement(Level::DEBUG, &trace("SELECT pg_sleep(1)", 40));
    sink.on_statement(Level::DEBUG, &trace("SELECT 2", 10));
    sink.on_slow_statement(&trace("SELECT pg_sleep(1)", 40), Duration::from_millis(20));
    sink.on_call(Level::INFO, &call(12, None));
    sink.on_call(Level::INFO, &call(8, Some("boom")));

    let stats = sink.stats();
    assert_eq!(stats.statements, 3);
    assert_eq!(stats.slow_statements, 1);
    assert_eq!(stats.total_statement_duration, Duration::from_millis(55));
    assert_eq!(stats.max_statement_duration, Duration::from_millis(40));
    assert_eq!(stats.slowest_statement.as_deref(), Some("SELECT pg_sleep(1)"));
    assert_eq!(stats.calls, 2);
    assert_eq!(stats.failed_calls, 1);
    assert_eq!(stats.total_call_duration, Duration::from_millis(20));

    sink.reset();
    assert_eq!(sink.stats(), TraceStats::default());
}

#[test]
fn noop_sink_disables_everything() {
    let sink = NoopSink;
    for kind in [TraceKind::Statement, TraceKind::Call] {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(!sink.enabled(kind, level));
        }
    }
}

#[test]
fn composite_sink_fans_out() {
    let first = Arc::new(StatsSink::new());
    let second = Arc::new(StatsSink::new());
    let sink = CompositeSink::new()
        .add_arc(first.clone())
        .add_arc(second.clone());

    sink.on_statement(Level::DEBUG, &trace("SELECT 1", 1));
    sink.on_call(Level::INFO, &call(3, None));

    for stats in [first.stats(), second.stats()] {
        assert_eq!(stats.statements, 1);
        assert_eq!(stats.calls, 1);
    }
}

#[test]
fn composite_sink_is_enabled_when_any_inner_sink_is() {
    assert!(!CompositeSink::new().enabled(TraceKind::Call, Level::INFO));
    assert!(!CompositeSink::new().add(NoopSink).enabled(TraceKind::Call, Level::INFO));
    assert!(
        CompositeSink::new()
            .add(NoopSink)
            .add(StatsSink::new())
            .enabled(TraceKind::Call, Level::INFO)
    );
}

#[test]
fn targets_per_kind() {
    assert_eq!(TraceKind::Statement.target(), "calltrace::statement");
    assert_eq!(TraceKind::Call.target(), "calltrace::call");
}

#[test]
fn tracing_sink_without_subscriber_is_disabled() {
    // No global subscriber is installed in unit tests.
    assert!(!TracingSink::new().enabled(TraceKind::Statement, Level::ERROR));
}

#[test]
fn tracing_sink_emits_without_subscriber() {
    let sink = TracingSink::new().max_sql_length(8);
    sink.on_statement(Level::DEBUG, &trace("SELECT * FROM a_very_long_table", 1));
    sink.on_slow_statement(&trace("SELECT 1", 100), Duration::from_millis(10));
    sink.on_call(Level::INFO, &call(1, None));
    sink.on_call(Level::INFO, &call(1, Some("boom")));
}
