//! Bound values and the capability interface used to look them up.
//!
//! A statement's bound object is anything implementing [`ParameterObject`]:
//! scalars answer through [`ParameterObject::scalar`], composites answer
//! property lookups by name. Structs get an implementation from
//! `#[derive(ParameterObject)]`.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// A single value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer.
    Int(i64),
    /// Any floating point number.
    Float(f64),
    /// Character data. Rendered single-quoted.
    Text(String),
    /// Point in time. Rendered in the local time zone, single-quoted.
    Timestamp(DateTime<Utc>),
    /// UUID.
    Uuid(Uuid),
    /// Anything else, already in its display form.
    Other(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            SqlValue::Uuid(v) => write!(f, "{v}"),
            SqlValue::Other(v) => f.write_str(v),
        }
    }
}

/// Conversion of a Rust value into a [`SqlValue`] for rendering.
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: ToSqlValue + ?Sized> ToSqlValue for &T {
    fn to_sql_value(&self) -> SqlValue {
        (**self).to_sql_value()
    }
}

macro_rules! int_to_sql_value {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(&self) -> SqlValue {
                    SqlValue::Int(i64::from(*self))
                }
            }
        )*
    };
}

int_to_sql_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for u64 {
    fn to_sql_value(&self) -> SqlValue {
        // Out of i64 range: keep the digits rather than wrapping.
        i64::try_from(*self)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::Other(self.to_string()))
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl ToSqlValue for str {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl ToSqlValue for DateTime<Local> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.with_timezone(&Utc))
    }
}

impl ToSqlValue for DateTime<FixedOffset> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.with_timezone(&Utc))
    }
}

/// Read as local wall-clock time, so it renders back unchanged.
impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(&self) -> SqlValue {
        let instant = Local
            .from_local_datetime(self)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            // Skipped by a DST transition: no local instant exists.
            .unwrap_or_else(|| self.and_utc());
        SqlValue::Timestamp(instant)
    }
}

/// Local midnight of the date.
impl ToSqlValue for NaiveDate {
    fn to_sql_value(&self) -> SqlValue {
        NaiveDateTime::from(*self).to_sql_value()
    }
}

impl ToSqlValue for Uuid {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Uuid(*self)
    }
}

/// The bound object of a statement, seen through a name → value lookup.
///
/// Implement [`scalar`](Self::scalar) for types that are bound as a whole
/// (and registered in a [`TypeRegistry`]), and [`property`](Self::property)
/// for composites. Property names may be dotted paths into nested objects.
pub trait ParameterObject: Send + Sync {
    /// Name the [`TypeRegistry`] uses to decide whether this object is a scalar.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The whole object as a single value, for directly handled types.
    fn scalar(&self) -> Option<SqlValue> {
        None
    }

    /// Look up a property by name. `None` means it cannot be resolved.
    fn property(&self, name: &str) -> Option<SqlValue>;
}

macro_rules! scalar_parameter_object {
    ($($ty:ty),*) => {
        $(
            impl ParameterObject for $ty {
                fn scalar(&self) -> Option<SqlValue> {
                    Some(self.to_sql_value())
                }

                fn property(&self, _name: &str) -> Option<SqlValue> {
                    None
                }
            }
        )*
    };
}

scalar_parameter_object!(
    SqlValue,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &'static str,
    DateTime<Utc>,
    DateTime<Local>,
    DateTime<FixedOffset>,
    NaiveDateTime,
    NaiveDate,
    Uuid
);

impl<S: std::hash::BuildHasher + Send + Sync> ParameterObject for HashMap<String, SqlValue, S> {
    fn property(&self, name: &str) -> Option<SqlValue> {
        self.get(name).cloned()
    }
}

impl ParameterObject for BTreeMap<String, SqlValue> {
    fn property(&self, name: &str) -> Option<SqlValue> {
        self.get(name).cloned()
    }
}

/// Type names whose bound objects are rendered as a single value instead of
/// being looked up property by property.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    scalars: HashSet<&'static str>,
}

impl TypeRegistry {
    /// Create a registry with the built-in scalar types registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<SqlValue>()
            .register::<bool>()
            .register::<i8>()
            .register::<i16>()
            .register::<i32>()
            .register::<i64>()
            .register::<u8>()
            .register::<u16>()
            .register::<u32>()
            .register::<u64>()
            .register::<f32>()
            .register::<f64>()
            .register::<String>()
            .register::<&'static str>()
            .register::<DateTime<Utc>>()
            .register::<DateTime<Local>>()
            .register::<DateTime<FixedOffset>>()
            .register::<NaiveDateTime>()
            .register::<NaiveDate>()
            .register::<Uuid>();
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            scalars: HashSet::new(),
        }
    }

    /// Register `T` as directly handled.
    pub fn register<T: ?Sized>(&mut self) -> &mut Self {
        self.scalars.insert(std::any::type_name::<T>());
        self
    }

    /// Register a type by the name its [`ParameterObject::type_name`] reports.
    pub fn register_name(&mut self, type_name: &'static str) -> &mut Self {
        self.scalars.insert(type_name);
        self
    }

    /// Whether objects reporting `type_name` are handled directly.
    pub fn has_handler(&self, type_name: &str) -> bool {
        self.scalars.contains(type_name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
