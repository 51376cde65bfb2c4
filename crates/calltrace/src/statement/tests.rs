use super::*;
use crate::sink::{StatementTrace, TraceKind, TraceSink};
use crate::value::{ParameterObject, SqlValue, TypeRegistry};
use chrono::{Local, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;

// ── Shared helpers ──

#[derive(Default)]
struct CaptureSink {
    disabled: AtomicBool,
    statements: Mutex<Vec<StatementTrace>>,
    slow: AtomicUsize,
}

impl CaptureSink {
    fn sql(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.sql.clone())
            .collect()
    }
}

impl TraceSink for CaptureSink {
    fn enabled(&self, _kind: TraceKind, _level: Level) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    fn on_statement(&self, _level: Level, trace: &StatementTrace) {
        self.statements.lock().unwrap().push(trace.clone());
    }

    fn on_slow_statement(&self, _trace: &StatementTrace, _threshold: Duration) {
        self.slow.fetch_add(1, Ordering::SeqCst);
    }
}

/// A composite bound object that counts property lookups.
#[derive(Default)]
struct CountingUser {
    lookups: AtomicUsize,
}

impl ParameterObject for CountingUser {
    fn property(&self, name: &str) -> Option<SqlValue> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match name {
            "id" => Some(SqlValue::Int(42)),
            "name" => Some(SqlValue::Text("Alice".into())),
            _ => None,
        }
    }
}

fn user_map() -> BTreeMap<String, SqlValue> {
    let mut map = BTreeMap::new();
    map.insert("id".to_string(), SqlValue::Int(42));
    map.insert("name".to_string(), SqlValue::Text("Alice".into()));
    map
}

fn render(stmt: &Statement) -> String {
    reconstruct(&stmt.bound_statement(), Some(&TypeRegistry::new()))
}

// ── Reconstruction ──

#[test]
fn substitutes_int_and_text() {
    let stmt = Statement::new("SELECT * FROM t WHERE id = ? AND name = ?")
        .param("id")
        .param("name")
        .bind(user_map());
    assert_eq!(
        render(&stmt),
        "SELECT * FROM t WHERE id = 42 AND name = 'Alice'"
    );
}

#[test]
fn text_is_not_escaped() {
    let stmt = Statement::new("SELECT * FROM t WHERE name = ?")
        .param("name")
        .bind(BTreeMap::from([(
            "name".to_string(),
            SqlValue::Text("O'Brien".into()),
        )]));
    assert_eq!(render(&stmt), "SELECT * FROM t WHERE name = 'O'Brien'");
}

#[test]
fn timestamp_renders_in_local_time() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 1).unwrap();
    let stmt = Statement::new("SELECT ?").param("at").additional("at", ts);

    let expected = format!(
        "SELECT '{}'",
        ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    let rendered = render(&stmt);
    assert_eq!(rendered, expected);

    let literal = rendered.trim_start_matches("SELECT ");
    let re = regex::Regex::new(r"^'\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}'$").unwrap();
    assert!(re.is_match(literal), "{literal}");
}

#[test]
fn out_parameters_keep_their_placeholder() {
    let stmt = Statement::new("CALL p(?, ?, ?)")
        .param("id")
        .out_param("total")
        .in_out_param("name")
        .bind(user_map());
    assert_eq!(render(&stmt), "CALL p(42, ?, 'Alice')");
}

#[test]
fn additional_parameters_win_over_bound_object() {
    let stmt = Statement::new("SELECT * FROM t WHERE id = ? AND name = ?")
        .param("id")
        .param("name")
        .additional("id", 7i64)
        .bind(user_map());
    assert_eq!(
        render(&stmt),
        "SELECT * FROM t WHERE id = 7 AND name = 'Alice'"
    );
}

#[test]
fn scalar_bound_object_is_used_as_is() {
    let stmt = Statement::new("DELETE FROM t WHERE id = ?")
        .param("id")
        .bind(99i64);
    assert_eq!(render(&stmt), "DELETE FROM t WHERE id = 99");

    let stmt = Statement::new("SELECT * FROM t WHERE name = ?")
        .param("whatever")
        .bind(String::from("bob"));
    assert_eq!(render(&stmt), "SELECT * FROM t WHERE name = 'bob'");
}

#[test]
fn missing_bound_object_renders_null() {
    let stmt = Statement::new("SELECT * FROM t WHERE id = ?").param("id");
    assert_eq!(render(&stmt), "SELECT * FROM t WHERE id = null");
}

#[test]
fn unresolvable_property_keeps_placeholder_and_continues() {
    let stmt = Statement::new("SELECT * FROM t WHERE a = ? AND id = ?")
        .param("nope")
        .param("id")
        .bind(user_map());
    assert_eq!(render(&stmt), "SELECT * FROM t WHERE a = ? AND id = 42");
}

#[test]
fn inserted_text_is_not_rescanned() {
    let stmt = Statement::new("SELECT * FROM t WHERE q = ? AND id = ?")
        .param("q")
        .param("id")
        .bind(BTreeMap::from([
            ("q".to_string(), SqlValue::Text("why?".into())),
            ("id".to_string(), SqlValue::Int(1)),
        ]));
    assert_eq!(render(&stmt), "SELECT * FROM t WHERE q = 'why?' AND id = 1");
}

#[test]
fn count_mismatch_is_best_effort() {
    let extra_placeholders = Statement::new("SELECT ?, ?, ?")
        .param("id")
        .bind(user_map());
    assert_eq!(render(&extra_placeholders), "SELECT 42, ?, ?");

    let extra_mappings = Statement::new("SELECT ?")
        .param("id")
        .param("name")
        .bind(user_map());
    assert_eq!(render(&extra_mappings), "SELECT 42");
}

#[test]
fn empty_template_or_missing_registry_is_empty() {
    let stmt = Statement::new("").param("id").bind(user_map());
    assert_eq!(render(&stmt), "");

    let stmt = Statement::new("SELECT ?").param("id").bind(user_map());
    assert_eq!(reconstruct(&stmt.bound_statement(), None), "");
}

#[test]
fn normalize_collapses_whitespace_and_backtick_space() {
    assert_eq!(
        normalize("SELECT\n  `id`,\t` name`\r\nFROM   t"),
        "SELECT `id`, `name`FROM t"
    );
}

#[test]
fn format_value_rules() {
    assert_eq!(format_value(&SqlValue::Text("x".into())), "'x'");
    assert_eq!(format_value(&SqlValue::Int(-3)), "-3");
    assert_eq!(format_value(&SqlValue::Bool(true)), "true");
    assert_eq!(format_value(&SqlValue::Null), "null");
}

// ── Interceptor ──

fn interceptor(sink: Arc<CaptureSink>) -> StatementTraceInterceptor {
    StatementTraceInterceptor::new()
        .with_registry(TypeRegistry::new())
        .with_sink_arc(sink)
}

#[tokio::test]
async fn logs_normalized_statement_after_call() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = interceptor(sink.clone());
    let stmt = Statement::new("SELECT *\n  FROM t\n WHERE id = ?")
        .param("id")
        .bind(user_map());

    let rows = interceptor.intercept(&stmt, async { vec![1, 2, 3] }).await;

    assert_eq!(rows, vec![1, 2, 3]);
    assert_eq!(sink.sql(), vec!["SELECT * FROM t WHERE id = 42"]);
}

#[tokio::test]
async fn elapsed_covers_the_wrapped_call() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = interceptor(sink.clone());
    let stmt = Statement::new("SELECT 1");

    interceptor
        .intercept(&stmt, tokio::time::sleep(Duration::from_millis(20)))
        .await;

    let traces = sink.statements.lock().unwrap();
    assert!(traces[0].elapsed >= Duration::from_millis(20));
}

#[tokio::test]
async fn failure_passes_through_unchanged_and_is_still_logged() {
    #[derive(Debug, PartialEq)]
    struct DbError(&'static str);

    let sink = Arc::new(CaptureSink::default());
    let interceptor = interceptor(sink.clone());
    let stmt = Statement::new("UPDATE t SET x = 1");

    let result: Result<u64, DbError> = interceptor
        .intercept(&stmt, async { Err(DbError("deadlock detected")) })
        .await;

    assert_eq!(result, Err(DbError("deadlock detected")));
    assert_eq!(sink.sql(), vec!["UPDATE t SET x = 1"]);
}

#[test]
fn disabled_level_skips_reconstruction() {
    let sink = Arc::new(CaptureSink::default());
    sink.disabled.store(true, Ordering::SeqCst);
    let interceptor = interceptor(sink.clone());

    let user = Arc::new(CountingUser::default());
    let stmt = Statement::new("SELECT * FROM t WHERE id = ? AND name = ?")
        .param("id")
        .param("name")
        .bind(ArcUser(user.clone()));

    let out = interceptor.intercept_blocking(&stmt, || Ok::<_, String>(5));

    assert_eq!(out, Ok(5));
    assert_eq!(user.lookups.load(Ordering::SeqCst), 0);
    assert!(sink.sql().is_empty());

    // Same setup with the level enabled does the lookups.
    sink.disabled.store(false, Ordering::SeqCst);
    interceptor.intercept_blocking(&stmt, || ());
    assert_eq!(user.lookups.load(Ordering::SeqCst), 2);
}

struct ArcUser(Arc<CountingUser>);

impl ParameterObject for ArcUser {
    fn property(&self, name: &str) -> Option<SqlValue> {
        self.0.property(name)
    }
}

#[test]
fn config_toggle_disables_tracing() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = interceptor(sink.clone())
        .with_config(crate::StatementTraceConfig::new().disable());
    assert!(!interceptor.is_active());

    interceptor.intercept_blocking(&Statement::new("SELECT 1"), || ());
    assert!(sink.sql().is_empty());
}

#[test]
fn registry_is_resolved_lazily_from_the_first_handle() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = StatementTraceInterceptor::new().with_sink_arc(sink.clone());

    // No registry anywhere: the line is skipped.
    let bare = Statement::new("SELECT ?").param("id").bind(user_map());
    interceptor.intercept_blocking(&bare, || ());
    assert!(sink.sql().is_empty());

    let registry = Arc::new(TypeRegistry::new());
    let with_registry = Statement::new("SELECT ?")
        .param("id")
        .bind(user_map())
        .with_registry(registry);
    interceptor.intercept_blocking(&with_registry, || ());

    // Cached: later handles without a registry still reconstruct.
    interceptor.intercept_blocking(&bare, || ());
    assert_eq!(sink.sql(), vec!["SELECT 42", "SELECT 42"]);
}

#[test]
fn concurrent_first_calls_share_one_registry() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = Arc::new(StatementTraceInterceptor::new().with_sink_arc(sink.clone()));
    let registry = Arc::new(TypeRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let interceptor = interceptor.clone();
            let registry = registry.clone();
            std::thread::spawn(move || {
                let stmt = Statement::new("SELECT ?")
                    .param("id")
                    .bind(i as i64)
                    .with_registry(registry);
                interceptor.intercept_blocking(&stmt, || i)
            })
        })
        .collect();

    let mut outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    outputs.sort();
    assert_eq!(outputs, (0..8).collect::<Vec<_>>());

    let mut logged = sink.sql();
    logged.sort();
    let mut expected: Vec<_> = (0..8).map(|i| format!("SELECT {i}")).collect();
    expected.sort();
    assert_eq!(logged, expected);
}

#[test]
fn slow_statements_are_reported() {
    let sink = Arc::new(CaptureSink::default());
    let interceptor = interceptor(sink.clone()).with_config(
        crate::StatementTraceConfig::new().with_slow_threshold(Duration::from_millis(1)),
    );

    interceptor.intercept_blocking(&Statement::new("SELECT 1"), || {
        std::thread::sleep(Duration::from_millis(5))
    });
    interceptor.intercept_blocking(&Statement::new("SELECT 2"), || ());

    assert_eq!(sink.slow.load(Ordering::SeqCst), 1);
    assert_eq!(sink.sql().len(), 2);
}

#[test]
fn panicking_sink_does_not_reach_the_caller() {
    struct ExplodingSink;
    impl TraceSink for ExplodingSink {
        fn enabled(&self, _: TraceKind, _: Level) -> bool {
            true
        }
        fn on_statement(&self, _: Level, _: &StatementTrace) {
            panic!("sink exploded");
        }
    }

    let interceptor = StatementTraceInterceptor::new()
        .with_registry(TypeRegistry::new())
        .with_sink(ExplodingSink);

    let out = interceptor.intercept_blocking(&Statement::new("SELECT 1"), || "rows");
    assert_eq!(out, "rows");
}

// ── Default tracing sink ──

/// Collects formatted subscriber output.
#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn subscriber(max_level: Level, output: CapturedOutput) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_ansi(false)
        .with_writer(move || output.clone())
        .finish()
}

#[test]
fn subscriber_level_gates_the_default_sink() {
    let output = CapturedOutput::default();
    let user = Arc::new(CountingUser::default());
    let interceptor = StatementTraceInterceptor::new().with_registry(TypeRegistry::new());
    let stmt = Statement::new("SELECT *\n  FROM t WHERE id = ?")
        .param("id")
        .bind(ArcUser(user.clone()));

    tracing::subscriber::with_default(subscriber(Level::INFO, output.clone()), || {
        assert!(!interceptor.is_active());
        assert_eq!(interceptor.intercept_blocking(&stmt, || 7), 7);
    });
    assert_eq!(user.lookups.load(Ordering::SeqCst), 0);
    assert!(output.text().is_empty());

    tracing::subscriber::with_default(subscriber(Level::DEBUG, output.clone()), || {
        assert!(interceptor.is_active());
        assert_eq!(interceptor.intercept_blocking(&stmt, || 7), 7);
    });
    assert_eq!(user.lookups.load(Ordering::SeqCst), 1);

    let logged = output.text();
    assert!(logged.contains("DEBUG"), "{logged}");
    assert!(logged.contains("calltrace::statement"), "{logged}");
    assert!(logged.contains("SELECT * FROM t WHERE id = 42"), "{logged}");
    assert!(logged.contains("cost "), "{logged}");
}
