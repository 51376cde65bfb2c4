//! # calltrace
//!
//! Audit tracing for a service's persistence and request-handling layers.
//!
//! ## Features
//!
//! - **Literal SQL**: statements are logged with their bound values substituted,
//!   ready to paste into a SQL console, together with their latency
//! - **Handler calls**: each successful handler call is logged with its location,
//!   arguments, truncated result and a `curl` command reproducing the request
//! - **Pay only when logging**: nothing is reconstructed or serialized unless the
//!   configured level is enabled
//! - **Transparent**: the wrapped call always runs and its output, success or
//!   failure, is returned untouched
//!
//! ## Statements
//!
//! ```ignore
//! use calltrace::{ParameterObject, Statement, StatementTraceInterceptor, TypeRegistry};
//!
//! #[derive(ParameterObject)]
//! struct UserFilter {
//!     id: i64,
//!     name: String,
//! }
//!
//! let interceptor = StatementTraceInterceptor::new().with_registry(TypeRegistry::new());
//! let stmt = Statement::new("SELECT * FROM users WHERE id = ? AND name = ?")
//!     .param("id")
//!     .param("name")
//!     .bind(UserFilter { id: 42, name: "Alice".into() });
//!
//! let rows = interceptor.intercept(&stmt, run(&stmt)).await?;
//! // SELECT * FROM users WHERE id = 42 AND name = 'Alice'
//! ```
//!
//! ## Handler calls
//!
//! ```ignore
//! use calltrace::{CallTraceConfig, CallTraceInterceptor, Invocation, call_site};
//!
//! let interceptor = CallTraceInterceptor::new(CallTraceConfig::new().enable());
//! let user = interceptor
//!     .intercept(
//!         Invocation::new(call_site!(UserController, "get")).arg("id", &id).with_request(&req),
//!         controller.get(id),
//!     )
//!     .await?;
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod prelude;
pub mod request;
pub mod sink;
pub mod statement;
pub mod value;

pub use call::{
    Argument, ArgumentKind, CallRecord, CallSite, CallTraceInterceptor, Infrastructure,
    Invocation, RecordedArg, SerializeValue,
};
pub use config::{CallTraceConfig, StatementTraceConfig, TraceConfig};
pub use error::{TraceError, TraceResult};
pub use request::{InboundRequest, RereadableRequest, TransportRequest, curl};
pub use sink::{
    CompositeSink, NoopSink, StatementTrace, StatsSink, TraceKind, TraceSink, TraceStats,
    TracingSink,
};
pub use statement::{
    BoundStatement, ParamMapping, ParamMode, Statement, StatementHandle,
    StatementTraceInterceptor, normalize, reconstruct,
};
pub use value::{ParameterObject, SqlValue, ToSqlValue, TypeRegistry};

#[cfg(feature = "derive")]
pub use calltrace_derive::ParameterObject;

use std::borrow::Cow;

/// Cut `s` to at most `max` characters, appending `marker` when something was cut.
pub(crate) fn truncate_chars<'a>(s: &'a str, max: usize, marker: &str) -> Cow<'a, str> {
    match s.char_indices().nth(max) {
        Some((end, _)) => Cow::Owned(format!("{}{marker}", &s[..end])),
        None => Cow::Borrowed(s),
    }
}
