//! Literal SQL reconstruction and statement tracing.
//!
//! [`reconstruct`] substitutes bound values into a `?`-placeholder template;
//! [`StatementTraceInterceptor`] wraps statement execution, times it, and logs
//! the literal statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use calltrace::{Statement, StatementTraceInterceptor, TypeRegistry};
//!
//! let interceptor = StatementTraceInterceptor::new().with_registry(TypeRegistry::new());
//!
//! let stmt = Statement::new("SELECT * FROM users WHERE id = ? AND name = ?")
//!     .param("id")
//!     .param("name")
//!     .bind(user_filter);
//!
//! let rows = interceptor.intercept(&stmt, client.query(stmt.sql(), &params)).await?;
//! // DEBUG calltrace::statement: SELECT * FROM users WHERE id = 42 AND name = 'Alice' ... cost 3ms
//! ```

mod interceptor;
mod reconstruct;

#[cfg(test)]
mod tests;

pub use interceptor::{Statement, StatementHandle, StatementTraceInterceptor};
pub use reconstruct::{
    BoundStatement, DATETIME_FORMAT, ParamMapping, ParamMode, format_value, normalize, reconstruct,
};
