use super::reconstruct::{BoundStatement, ParamMapping, normalize, reconstruct};
use crate::config::StatementTraceConfig;
use crate::sink::{StatementTrace, TraceKind, TraceSink, TracingSink, guarded};
use crate::value::{ParameterObject, SqlValue, ToSqlValue, TypeRegistry};
use std::collections::BTreeMap;
use std::future::IntoFuture;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// What the persistence layer exposes about a statement being executed.
pub trait StatementHandle {
    /// The template, its mappings and the values bound to it.
    fn bound_statement(&self) -> BoundStatement<'_>;

    /// The registry of directly handled types, if this handle can reach one.
    ///
    /// Only consulted until an interceptor has cached a registry.
    fn type_registry(&self) -> Option<Arc<TypeRegistry>> {
        None
    }
}

/// An owned statement: template, mappings and bound values.
///
/// ```rust,ignore
/// let stmt = Statement::new("UPDATE users SET name = ? WHERE id = ?")
///     .param("name")
///     .param("id")
///     .bind(user);
/// ```
#[derive(Default)]
pub struct Statement {
    sql: String,
    mappings: Vec<ParamMapping>,
    parameter: Option<Box<dyn ParameterObject>>,
    additional: BTreeMap<String, SqlValue>,
    registry: Option<Arc<TypeRegistry>>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Append an input parameter mapping.
    pub fn param(self, property: impl Into<String>) -> Self {
        self.mapping(ParamMapping::new(property))
    }

    /// Append an output parameter mapping.
    pub fn out_param(self, property: impl Into<String>) -> Self {
        self.mapping(ParamMapping::out(property))
    }

    /// Append an input/output parameter mapping.
    pub fn in_out_param(self, property: impl Into<String>) -> Self {
        self.mapping(ParamMapping::in_out(property))
    }

    pub fn mapping(mut self, mapping: ParamMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Set the bound object.
    pub fn bind<P: ParameterObject + 'static>(mut self, parameter: P) -> Self {
        self.parameter = Some(Box::new(parameter));
        self
    }

    /// Add a value that is resolved before the bound object is consulted.
    pub fn additional(mut self, name: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.additional.insert(name.into(), value.to_sql_value());
        self
    }

    /// Expose a type registry to interceptors.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The statement template.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn mappings(&self) -> &[ParamMapping] {
        &self.mappings
    }
}

impl StatementHandle for Statement {
    fn bound_statement(&self) -> BoundStatement<'_> {
        BoundStatement {
            sql: &self.sql,
            mappings: &self.mappings,
            parameter: self.parameter.as_deref(),
            additional: (!self.additional.is_empty()).then_some(&self.additional),
        }
    }

    fn type_registry(&self) -> Option<Arc<TypeRegistry>> {
        self.registry.clone()
    }
}

/// Wraps statement execution and logs the literal statement with its latency.
///
/// The wrapped call always runs first and its output is returned untouched.
/// Reconstruction happens afterwards, and only when the configuration and the
/// sink both have the configured level enabled.
///
/// One instance is meant to be shared by every connection; the only shared
/// state is the type registry, resolved once.
pub struct StatementTraceInterceptor {
    config: StatementTraceConfig,
    sink: Arc<dyn TraceSink>,
    registry: OnceLock<Arc<TypeRegistry>>,
}

impl StatementTraceInterceptor {
    /// Create an interceptor logging through [`TracingSink`], with no registry yet.
    pub fn new() -> Self {
        Self {
            config: StatementTraceConfig::default(),
            sink: Arc::new(TracingSink::new()),
            registry: OnceLock::new(),
        }
    }

    pub fn with_config(mut self, config: StatementTraceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink<S: TraceSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_sink_arc(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Resolve the type registry eagerly instead of from the first statement.
    pub fn with_registry(self, registry: TypeRegistry) -> Self {
        self.with_registry_arc(Arc::new(registry))
    }

    pub fn with_registry_arc(self, registry: Arc<TypeRegistry>) -> Self {
        let _ = self.registry.set(registry);
        self
    }

    pub fn config(&self) -> &StatementTraceConfig {
        &self.config
    }

    /// Whether a statement completing now would be reconstructed and logged.
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.sink.enabled(TraceKind::Statement, self.config.level)
    }

    /// Await `call`, then trace `handle`. Returns the call's output as is.
    pub async fn intercept<H, F>(&self, handle: &H, call: F) -> F::Output
    where
        H: StatementHandle + ?Sized,
        F: IntoFuture,
    {
        let start = Instant::now();
        let output = call.await;
        self.complete(handle, start.elapsed());
        output
    }

    /// Run `call`, then trace `handle`. Returns the call's output as is.
    pub fn intercept_blocking<H, T>(&self, handle: &H, call: impl FnOnce() -> T) -> T
    where
        H: StatementHandle + ?Sized,
    {
        let start = Instant::now();
        let output = call();
        self.complete(handle, start.elapsed());
        output
    }

    fn complete<H: StatementHandle + ?Sized>(&self, handle: &H, elapsed: Duration) {
        if !self.is_active() {
            return;
        }
        guarded(|| {
            let Some(registry) = self.registry_for(handle) else {
                return;
            };
            let sql = reconstruct(&handle.bound_statement(), Some(registry));
            if sql.is_empty() {
                return;
            }
            let trace = StatementTrace {
                sql: normalize(&sql),
                elapsed,
            };
            self.sink.on_statement(self.config.level, &trace);
            if let Some(threshold) = self.config.slow_threshold {
                if elapsed > threshold {
                    self.sink.on_slow_statement(&trace, threshold);
                }
            }
        });
    }

    fn registry_for<H: StatementHandle + ?Sized>(&self, handle: &H) -> Option<&TypeRegistry> {
        if let Some(registry) = self.registry.get() {
            return Some(registry.as_ref());
        }
        // Racing first calls resolve the same registry; whichever set lands is kept.
        let resolved = handle.type_registry()?;
        let _ = self.registry.set(resolved);
        self.registry.get().map(|registry| registry.as_ref())
    }
}

impl Default for StatementTraceInterceptor {
    fn default() -> Self {
        Self::new()
    }
}
