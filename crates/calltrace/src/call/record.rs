use super::site::CallSite;
use crate::truncate_chars;
use serde::Serialize;
use std::borrow::Cow;

/// Longest serialized result kept in a record, in characters.
pub const MAX_RESULT_CHARS: usize = 1000;

/// Appended to a result cut at [`MAX_RESULT_CHARS`].
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// An argument as it appears in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedArg {
    pub name: String,
    /// JSON text.
    pub value: String,
}

/// Everything logged about one handler call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    pub site: CallSite,
    /// `METHOD /uri` of the originating request, when one was attached.
    pub request_line: Option<String>,
    /// `curl` reconstruction of the originating request.
    pub command: Option<String>,
    /// Eligible arguments, in declaration order.
    pub args: Vec<RecordedArg>,
    /// Serialized result, possibly truncated. `None` for failed calls or
    /// results that could not be serialized.
    pub result: Option<String>,
    pub elapsed_ms: u64,
    /// Error text of a failed call.
    pub failure: Option<String>,
}

impl CallRecord {
    /// `name=value, name=value`
    pub fn args_display(&self) -> String {
        self.args
            .iter()
            .map(|arg| format!("{}={}", arg.name, arg.value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Cap a serialized result at [`MAX_RESULT_CHARS`], marking the cut.
pub fn truncate_result(json: String) -> String {
    let cut = match truncate_chars(&json, MAX_RESULT_CHARS, TRUNCATION_MARKER) {
        Cow::Owned(cut) => Some(cut),
        Cow::Borrowed(_) => None,
    };
    cut.unwrap_or(json)
}
