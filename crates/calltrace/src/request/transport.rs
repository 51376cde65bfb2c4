use super::InboundRequest;
use bytes::Bytes;
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};

/// A request whose body is a one-shot stream, the way it arrives off the wire.
///
/// The first [`read_body`](InboundRequest::read_body) drains the stream; every
/// later read returns an empty body.
pub struct TransportRequest {
    method: String,
    uri: String,
    url: String,
    headers: Vec<(String, String)>,
    parameters: Vec<(String, String)>,
    body: Mutex<Option<Box<dyn Read + Send>>>,
}

impl TransportRequest {
    /// Create a request for `url` (absolute, without query string).
    ///
    /// The request URI is the path of `url`, or `url` itself when it does not parse.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let uri = url::Url::parse(&url)
            .map(|parsed| parsed.path().to_string())
            .unwrap_or_else(|_| url.clone());
        Self {
            method: method.into(),
            uri,
            url,
            headers: Vec::new(),
            parameters: Vec::new(),
            body: Mutex::new(None),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Set the body stream.
    pub fn body<R: Read + Send + 'static>(mut self, body: R) -> Self {
        self.body = Mutex::new(Some(Box::new(body)));
        self
    }

    /// Set an in-memory body.
    pub fn body_bytes(self, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        self.body(io::Cursor::new(body))
    }
}

impl InboundRequest for TransportRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn request_uri(&self) -> &str {
        &self.uri
    }

    fn request_url(&self) -> &str {
        &self.url
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    fn read_body(&self) -> io::Result<Bytes> {
        let stream = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut stream) = stream else {
            return Ok(Bytes::new());
        };
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}
