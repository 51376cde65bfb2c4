//! Handler call tracing.
//!
//! [`CallTraceInterceptor`] wraps a handler invocation. On success it logs the
//! handler's location, the originating request, a `curl` reconstruction of that
//! request, the serializable arguments and the (truncated) result.
//!
//! # Example
//!
//! ```rust,ignore
//! use calltrace::{CallTraceConfig, CallTraceInterceptor, Infrastructure, Invocation, call_site};
//!
//! let interceptor = CallTraceInterceptor::new(CallTraceConfig::default().enable());
//!
//! let user = interceptor
//!     .intercept(
//!         Invocation::new(call_site!(UserController, "create"))
//!             .arg("user", &new_user)
//!             .excluded("request", Infrastructure::Request)
//!             .with_request(&request),
//!         controller.create(&new_user),
//!     )
//!     .await?;
//! ```

mod argument;
mod interceptor;
mod record;
mod site;


pub use argument::{Argument, ArgumentKind, Infrastructure, SerializeValue, serialize_value};
pub use interceptor::{CallTraceInterceptor, Invocation};
pub use record::{CallRecord, MAX_RESULT_CHARS, RecordedArg, TRUNCATION_MARKER, truncate_result};
pub use site::CallSite;
