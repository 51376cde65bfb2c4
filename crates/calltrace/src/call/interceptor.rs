use super::argument::{Argument, Infrastructure, serialize_value};
use super::record::{CallRecord, RecordedArg, truncate_result};
use super::site::CallSite;
use crate::config::CallTraceConfig;
use crate::request::{InboundRequest, curl};
use crate::sink::{TraceKind, TraceSink, TracingSink, guarded};
use serde::Serialize;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One handler invocation as seen by the interceptor.
///
/// ```rust,ignore
/// let invocation = Invocation::new(call_site!(UserController, "create"))
///     .arg("user", &new_user)
///     .excluded("request", Infrastructure::Request)
///     .with_request(&request);
/// ```
pub struct Invocation<'a> {
    site: CallSite,
    args: Vec<Argument<'a>>,
    request: Option<&'a dyn InboundRequest>,
}

impl<'a> Invocation<'a> {
    pub fn new(site: CallSite) -> Self {
        Self {
            site,
            args: Vec::new(),
            request: None,
        }
    }

    /// Add a serializable argument.
    pub fn arg<T: Serialize + Sync>(self, name: &'a str, value: &'a T) -> Self {
        self.argument(Argument::value(name, value))
    }

    /// Add a framework argument that is never recorded.
    pub fn excluded(self, name: &'a str, what: Infrastructure) -> Self {
        self.argument(Argument::excluded(name, what))
    }

    /// Add an argument that cannot be serialized.
    pub fn opaque(self, name: &'a str) -> Self {
        self.argument(Argument::opaque(name))
    }

    pub fn argument(mut self, argument: Argument<'a>) -> Self {
        self.args.push(argument);
        self
    }

    /// Attach the inbound request the handler is serving.
    pub fn with_request(mut self, request: &'a dyn InboundRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    pub fn args(&self) -> &[Argument<'a>] {
        &self.args
    }
}

/// What is captured before the handler runs.
struct Captured {
    args: Vec<RecordedArg>,
    request_line: Option<String>,
}

/// Wraps handler invocations and logs a [`CallRecord`] for each successful one.
///
/// Arguments are captured before the handler runs; the result after. The
/// handler's output is always returned untouched. Failed calls are not logged
/// unless [`CallTraceConfig::log_failed_calls`] is set.
///
/// The interceptor holds no per-call state and can be shared freely.
pub struct CallTraceInterceptor {
    config: CallTraceConfig,
    sink: Arc<dyn TraceSink>,
}

impl CallTraceInterceptor {
    /// Create an interceptor logging through [`TracingSink`].
    ///
    /// Note that [`CallTraceConfig::default`] is disabled; pass an enabled config.
    pub fn new(config: CallTraceConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink::new()),
        }
    }

    pub fn with_sink<S: TraceSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_sink_arc(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &CallTraceConfig {
        &self.config
    }

    /// Whether a call made now would be recorded.
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.sink.enabled(TraceKind::Call, self.config.level)
    }

    /// Await the handler future and record the call.
    pub async fn intercept<T, E, F>(&self, invocation: Invocation<'_>, call: F) -> Result<T, E>
    where
        F: IntoFuture<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
    {
        if !self.is_active() {
            return call.await;
        }
        let captured = self.capture(&invocation);
        let start = Instant::now();
        let outcome = call.await;
        self.finish(&invocation, captured, &outcome, start.elapsed());
        outcome
    }

    /// Run the handler and record the call.
    pub fn intercept_blocking<T, E>(
        &self,
        invocation: Invocation<'_>,
        call: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: fmt::Display,
    {
        if !self.is_active() {
            return call();
        }
        let captured = self.capture(&invocation);
        let start = Instant::now();
        let outcome = call();
        self.finish(&invocation, captured, &outcome, start.elapsed());
        outcome
    }

    fn capture(&self, invocation: &Invocation<'_>) -> Option<Captured> {
        guarded(|| Captured {
            args: invocation
                .args
                .iter()
                .filter_map(|arg| {
                    arg.eligible_json().map(|value| RecordedArg {
                        name: arg.name.to_string(),
                        value,
                    })
                })
                .collect(),
            request_line: invocation.request.map(|request| request.request_line()),
        })
    }

    fn finish<T: Serialize, E: fmt::Display>(
        &self,
        invocation: &Invocation<'_>,
        captured: Option<Captured>,
        outcome: &Result<T, E>,
        elapsed: Duration,
    ) {
        let Some(captured) = captured else {
            return;
        };
        if outcome.is_err() && !self.config.log_failed_calls {
            return;
        }
        guarded(|| {
            let (result, failure) = match outcome {
                Ok(value) => (serialize_value(value).ok().map(truncate_result), None),
                Err(e) => (None, Some(e.to_string())),
            };
            let command = invocation
                .request
                .filter(|_| self.config.include_command)
                .map(curl);
            let record = CallRecord {
                site: invocation.site,
                request_line: captured.request_line,
                command,
                args: captured.args,
                result,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                failure,
            };
            self.sink.on_call(self.config.level, &record);
        });
    }
}
