use crate::value::{ParameterObject, SqlValue, TypeRegistry};
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Timestamp layout used when rendering temporal values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PLACEHOLDER: char = '?';

/// Direction of a statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamMode {
    /// Input parameter.
    #[default]
    In,
    /// Output parameter. Never rendered.
    Out,
    /// Input/output parameter.
    InOut,
}

/// Describes the value bound to one placeholder, by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMapping {
    /// Property (or additional parameter) name the value is resolved from.
    pub property: String,
    /// Parameter direction.
    pub mode: ParamMode,
}

impl ParamMapping {
    /// An input parameter.
    pub fn new(property: impl Into<String>) -> Self {
        Self::with_mode(property, ParamMode::In)
    }

    /// An output parameter.
    pub fn out(property: impl Into<String>) -> Self {
        Self::with_mode(property, ParamMode::Out)
    }

    /// An input/output parameter.
    pub fn in_out(property: impl Into<String>) -> Self {
        Self::with_mode(property, ParamMode::InOut)
    }

    pub fn with_mode(property: impl Into<String>, mode: ParamMode) -> Self {
        Self {
            property: property.into(),
            mode,
        }
    }
}

/// Borrowed view of a statement as handed over by the persistence layer.
#[derive(Clone, Copy)]
pub struct BoundStatement<'a> {
    /// Statement text with `?` placeholders.
    pub sql: &'a str,
    /// One mapping per placeholder, in order.
    pub mappings: &'a [ParamMapping],
    /// The caller-supplied bound object, if any.
    pub parameter: Option<&'a dyn ParameterObject>,
    /// Values injected outside the bound object. Checked first.
    pub additional: Option<&'a BTreeMap<String, SqlValue>>,
}

impl<'a> BoundStatement<'a> {
    pub fn new(sql: &'a str, mappings: &'a [ParamMapping]) -> Self {
        Self {
            sql,
            mappings,
            parameter: None,
            additional: None,
        }
    }

    /// Attach the bound object.
    pub fn with_parameter(mut self, parameter: &'a dyn ParameterObject) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Attach additional (non-bound) parameter values.
    pub fn with_additional(mut self, additional: &'a BTreeMap<String, SqlValue>) -> Self {
        self.additional = Some(additional);
        self
    }

    fn resolve(&self, property: &str, registry: &TypeRegistry) -> Option<SqlValue> {
        if let Some(value) = self.additional.and_then(|extra| extra.get(property)) {
            return Some(value.clone());
        }
        let Some(parameter) = self.parameter else {
            return Some(SqlValue::Null);
        };
        if registry.has_handler(parameter.type_name()) {
            parameter.scalar()
        } else {
            parameter.property(property)
        }
    }
}

/// Render a value the way it appears in a literal statement.
///
/// Text is single-quoted without escaping, so an embedded `'` stays as is.
pub fn format_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(text) => format!("'{text}'"),
        SqlValue::Timestamp(ts) => {
            format!("'{}'", ts.with_timezone(&Local).format(DATETIME_FORMAT))
        }
        other => other.to_string(),
    }
}

/// Substitute every placeholder of `statement` with its resolved, formatted value.
///
/// Returns an empty string for an empty template or when no registry is available.
/// Each mapping consumes one placeholder, left to right; `Out` mappings and values
/// that cannot be resolved leave their placeholder as `?`. Extra placeholders stay,
/// extra mappings are ignored.
pub fn reconstruct(statement: &BoundStatement<'_>, registry: Option<&TypeRegistry>) -> String {
    let sql = statement.sql;
    if sql.is_empty() {
        return String::new();
    }
    let Some(registry) = registry else {
        return String::new();
    };

    let mut out = String::with_capacity(sql.len() + statement.mappings.len() * 8);
    let mut rest = sql;
    for mapping in statement.mappings {
        let Some(pos) = rest.find(PLACEHOLDER) else {
            break;
        };
        out.push_str(&rest[..pos]);
        rest = &rest[pos + PLACEHOLDER.len_utf8()..];

        let rendered = match mapping.mode {
            ParamMode::Out => None,
            ParamMode::In | ParamMode::InOut => statement
                .resolve(&mapping.property, registry)
                .map(|value| format_value(&value)),
        };
        match rendered {
            Some(text) => out.push_str(&text),
            None => out.push(PLACEHOLDER),
        }
    }
    out.push_str(rest);
    out
}

/// Collapse whitespace runs to a single space and drop the space after a backtick.
pub fn normalize(sql: &str) -> String {
    static WHITESPACE: OnceLock<regex::Regex> = OnceLock::new();
    let re = WHITESPACE
        .get_or_init(|| regex::Regex::new(r"\s+").expect("invalid built-in whitespace regex"));
    re.replace_all(sql, " ").replace("` ", "`")
}
