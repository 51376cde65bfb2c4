//! Inbound request access for handler tracing.
//!
//! [`InboundRequest`] is the view of an HTTP request the call interceptor needs.
//! A transport body can be drained only once; wrap requests in
//! [`RereadableRequest`] before dispatch so both the handler and the tracer can
//! read it. [`curl`] rebuilds a reproducible command line from a request.

mod curl;
mod rereadable;
mod transport;


use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use std::io;

pub use curl::{RETAINED_HEADERS, curl};
pub use rereadable::{RereadableRequest, find_rereadable, read_body_text};
pub use transport::TransportRequest;

/// Read access to an inbound request.
///
/// Decorators return the request they wrap from [`inner`](Self::inner), so a
/// chain can be walked to find a specific layer.
pub trait InboundRequest: Send + Sync {
    /// HTTP method, e.g. `GET`.
    fn method(&self) -> &str;

    /// Path part of the request line, e.g. `/users/42`.
    fn request_uri(&self) -> &str;

    /// Absolute URL without query string, e.g. `http://localhost:8080/users/42`.
    fn request_url(&self) -> &str;

    /// Headers in arrival order.
    fn headers(&self) -> &[(String, String)];

    /// Decoded query/form parameters in arrival order.
    fn parameters(&self) -> &[(String, String)] {
        &[]
    }

    /// First header named `name`, case-insensitively.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Declared character encoding: the `charset` parameter of the content type.
    fn character_encoding(&self) -> Option<&str> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    /// Read the whole body.
    ///
    /// For a transport-level request this drains the underlying stream; a second
    /// call sees it exhausted.
    fn read_body(&self) -> io::Result<Bytes>;

    /// The request this one decorates, if any.
    fn inner(&self) -> Option<&dyn InboundRequest> {
        None
    }

    /// `Some` only for the body-buffering decorator.
    fn as_rereadable(&self) -> Option<&RereadableRequest> {
        None
    }

    /// `METHOD /uri`
    fn request_line(&self) -> String {
        format!("{} {}", self.method(), self.request_uri())
    }
}

/// Encoding for a declared charset label.
///
/// Labels resolve the way browsers resolve them (`latin1` is windows-1252,
/// `utf-16le`, `shift_jis`, ...). No label, or an unknown one, means UTF-8.
pub fn encoding_for(label: Option<&str>) -> &'static Encoding {
    label
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode a captured body with the declared charset. Malformed sequences become U+FFFD.
pub fn decode_body(label: Option<&str>, bytes: &[u8]) -> String {
    let (text, _, _) = encoding_for(label).decode(bytes);
    text.into_owned()
}
