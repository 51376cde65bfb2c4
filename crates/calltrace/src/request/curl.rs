use super::InboundRequest;
use super::rereadable::read_body_text;

/// Headers copied into the command. Everything else is left out.
pub const RETAINED_HEADERS: [&str; 3] = ["Accept", "Content-Type", "Authorization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// JSON or XML: the raw body is sent.
    Raw,
    /// Form-encoded: parameters are sent as the body.
    Form,
    /// Anything else: parameters go into the query string.
    None,
}

fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::None;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/json" | "application/xml" | "text/xml" => BodyKind::Raw,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        other if other.ends_with("+json") || other.ends_with("+xml") => BodyKind::Raw,
        _ => BodyKind::None,
    }
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn encoded_parameters(request: &dyn InboundRequest) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(request.parameters())
        .finish()
}

/// Rebuild `request` as a `curl` command line.
///
/// Only [`RETAINED_HEADERS`] are carried over. JSON/XML bodies are read through
/// the request's [`RereadableRequest`](super::RereadableRequest) layer; without
/// one the body is omitted.
pub fn curl(request: &dyn InboundRequest) -> String {
    let mut parts = vec!["curl".to_string()];

    for (name, value) in request.headers() {
        if RETAINED_HEADERS
            .iter()
            .any(|kept| kept.eq_ignore_ascii_case(name))
        {
            parts.push(format!("-H {}", shell_quote(&format!("{name}: {value}"))));
        }
    }

    parts.push(format!("-X {}", request.method()));

    let params = encoded_parameters(request);
    let mut url = request.request_url().to_string();
    match body_kind(request.content_type()) {
        BodyKind::Raw => {
            let body = match read_body_text(request) {
                Ok(body) => body.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(error = %e, "error reading request body");
                    String::new()
                }
            };
            parts.push(format!("--data {}", shell_quote(&body)));
        }
        BodyKind::Form => parts.push(format!("--data {}", shell_quote(&params))),
        BodyKind::None if !params.is_empty() => {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&params);
        }
        BodyKind::None => {}
    }

    parts.push(shell_quote(&url));
    parts.join(" ")
}
