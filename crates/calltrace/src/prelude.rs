//! Convenient imports for typical `calltrace` usage.
//!
//! ```ignore
//! use calltrace::prelude::*;
//! ```

pub use crate::{
    CallSite, CallTraceConfig, CallTraceInterceptor, InboundRequest, Infrastructure, Invocation,
    ParameterObject, RereadableRequest, SqlValue, Statement, StatementHandle,
    StatementTraceConfig, StatementTraceInterceptor, ToSqlValue, TraceConfig, TraceError,
    TraceResult, TraceSink, TracingSink, TypeRegistry, call_site,
};
