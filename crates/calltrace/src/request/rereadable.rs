use super::{InboundRequest, decode_body};
use crate::error::TraceResult;
use bytes::{Buf, Bytes};
use std::io;
use std::sync::{Mutex, PoisonError};

/// A request decorator whose body can be read any number of times.
///
/// The first [`read_body`](InboundRequest::read_body) drains the wrapped
/// request and keeps the bytes; every later read returns the same buffer and
/// never touches the drained source. Everything else is delegated.
pub struct RereadableRequest {
    inner: Box<dyn InboundRequest>,
    body: Mutex<Option<Bytes>>,
}

impl RereadableRequest {
    pub fn new<R: InboundRequest + 'static>(inner: R) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    pub fn from_boxed(inner: Box<dyn InboundRequest>) -> Self {
        Self {
            inner,
            body: Mutex::new(None),
        }
    }

    /// The buffered body, if it has been read already.
    pub fn cached_body(&self) -> Option<Bytes> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The body as a reader, for consumers expecting a stream.
    pub fn body_reader(&self) -> io::Result<bytes::buf::Reader<Bytes>> {
        Ok(self.read_body()?.reader())
    }

    /// The body decoded with the declared charset (UTF-8 when none is declared).
    pub fn body_text(&self) -> io::Result<String> {
        let body = self.read_body()?;
        Ok(decode_body(self.character_encoding(), &body))
    }

    /// Unwrap the decorated request.
    pub fn into_inner(self) -> Box<dyn InboundRequest> {
        self.inner
    }
}

impl InboundRequest for RereadableRequest {
    fn method(&self) -> &str {
        self.inner.method()
    }

    fn request_uri(&self) -> &str {
        self.inner.request_uri()
    }

    fn request_url(&self) -> &str {
        self.inner.request_url()
    }

    fn headers(&self) -> &[(String, String)] {
        self.inner.headers()
    }

    fn parameters(&self) -> &[(String, String)] {
        self.inner.parameters()
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn character_encoding(&self) -> Option<&str> {
        self.inner.character_encoding()
    }

    fn read_body(&self) -> io::Result<Bytes> {
        // Held across the drain so concurrent first readers wait for one read.
        let mut body = self.body.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = body.as_ref() {
            return Ok(cached.clone());
        }
        let drained = self.inner.read_body()?;
        *body = Some(drained.clone());
        Ok(drained)
    }

    fn inner(&self) -> Option<&dyn InboundRequest> {
        Some(self.inner.as_ref())
    }

    fn as_rereadable(&self) -> Option<&RereadableRequest> {
        Some(self)
    }
}

/// Walk a decorator chain, outermost first, to the body-buffering layer.
pub fn find_rereadable(request: &dyn InboundRequest) -> Option<&RereadableRequest> {
    let mut current = request;
    loop {
        if let Some(found) = current.as_rereadable() {
            return Some(found);
        }
        current = current.inner()?;
    }
}

/// Body text of `request`, read through its buffering layer.
///
/// `Ok(None)` when the chain has no [`RereadableRequest`]: the transport stream
/// is left alone rather than drained out from under the handler. Decoding uses
/// the outermost request's declared charset.
pub fn read_body_text(request: &dyn InboundRequest) -> TraceResult<Option<String>> {
    let Some(rereadable) = find_rereadable(request) else {
        return Ok(None);
    };
    let body = rereadable.read_body()?;
    Ok(Some(decode_body(request.character_encoding(), &body)))
}
