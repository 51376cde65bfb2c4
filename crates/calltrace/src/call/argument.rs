use crate::error::TraceResult;
use serde::Serialize;

/// Object-safe JSON serialization, so arguments of different types fit one list.
pub trait SerializeValue {
    fn to_json(&self) -> TraceResult<String>;
}

impl<T: Serialize + ?Sized> SerializeValue for T {
    fn to_json(&self) -> TraceResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize `value` to JSON text.
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> TraceResult<String> {
    value.to_json()
}

/// Framework objects that are never written into a call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infrastructure {
    /// Validation/binding outcome carriers.
    ValidationResult,
    /// The inbound request object.
    Request,
    /// The outbound response object.
    Response,
}

/// How a handler argument takes part in the record.
#[derive(Clone, Copy)]
pub enum ArgumentKind<'a> {
    /// A serializable value; recorded if serialization succeeds.
    Value(&'a (dyn SerializeValue + Sync)),
    /// Framework plumbing; never recorded.
    Excluded(Infrastructure),
    /// Not serializable; never recorded.
    Opaque,
}

/// One handler argument.
#[derive(Clone, Copy)]
pub struct Argument<'a> {
    pub name: &'a str,
    pub kind: ArgumentKind<'a>,
}

impl<'a> Argument<'a> {
    pub fn value<T: Serialize + Sync>(name: &'a str, value: &'a T) -> Self {
        Self {
            name,
            kind: ArgumentKind::Value(value),
        }
    }

    pub fn excluded(name: &'a str, what: Infrastructure) -> Self {
        Self {
            name,
            kind: ArgumentKind::Excluded(what),
        }
    }

    pub fn opaque(name: &'a str) -> Self {
        Self {
            name,
            kind: ArgumentKind::Opaque,
        }
    }

    /// Serialized form, or `None` when the argument is not eligible.
    ///
    /// The kind is checked first; serialization only runs for values.
    pub fn eligible_json(&self) -> Option<String> {
        match self.kind {
            ArgumentKind::Value(value) => value.to_json().ok(),
            ArgumentKind::Excluded(_) | ArgumentKind::Opaque => None,
        }
    }
}
