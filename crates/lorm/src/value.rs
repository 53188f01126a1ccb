//! Dynamically typed column values and conversions to and from Rust types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single column value as it travels between the query builder and the database.
///
/// The variants mirror SQLite's storage classes. Typed entity fields convert through
/// [`FromValue`] and [`ToValue`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Storage class name, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    /// Render this value as an inline SQL literal.
    ///
    /// Text is single-quoted with embedded quotes doubled. This is only used by
    /// `Query::in_list`, which must never receive untrusted input.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) if r.is_finite() => format!("{r:?}"),
            Value::Real(_) => "NULL".to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Blob(b) => {
                let mut out = String::with_capacity(b.len() * 2 + 3);
                out.push_str("X'");
                for byte in b {
                    out.push_str(&format!("{byte:02X}"));
                }
                out.push('\'');
                out
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! impl_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_value_from_int!(i64, i32, i16, i8, u32, u16, u8);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Bound arguments for a query fragment.
///
/// Converts from a single scalar (one argument), a `Vec` or array (in order), or `()`
/// (no arguments).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(pub(crate) Vec<Value>);

impl Args {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::none()
    }
}

macro_rules! impl_args_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Args {
                fn from(v: $t) -> Self {
                    Args(vec![v.into()])
                }
            }

            impl From<Vec<$t>> for Args {
                fn from(v: Vec<$t>) -> Self {
                    Args(v.into_iter().map(Into::into).collect())
                }
            }

            impl<const N: usize> From<[$t; N]> for Args {
                fn from(v: [$t; N]) -> Self {
                    Args(v.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

impl_args_from!(Value, i64, i32, i16, u32, f64, bool, String, &str);

/// Convert a [`Value`] read from the database into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

/// Convert a Rust value into a [`Value`] for binding.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, found {}", got.kind())
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch("INTEGER", &other)),
        }
    }
}

macro_rules! impl_narrow_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, String> {
                    let wide = i64::from_value(value)?;
                    <$t>::try_from(wide)
                        .map_err(|_| format!("integer {wide} out of range for {}", stringify!($t)))
                }
            }

            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }
            }
        )*
    };
}

impl_narrow_int!(i32, i16, i8, u32, u16, u8);

impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch("REAL", &other)),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            other => Err(mismatch("INTEGER (0/1)", &other)),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Blob(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("BLOB", &other)),
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

// Date/time, JSON and UUID values are stored as TEXT.

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl FromValue for chrono::NaiveDate {
    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| e.to_string())
    }
}

impl ToValue for chrono::NaiveDate {
    fn to_value(&self) -> Value {
        Value::Text(self.format("%Y-%m-%d").to_string())
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        chrono::NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT).map_err(|e| e.to_string())
    }
}

impl ToValue for chrono::NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Text(self.format(DATETIME_FORMAT).to_string())
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        chrono::DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| e.to_string())
    }
}

impl ToValue for chrono::DateTime<chrono::Utc> {
    fn to_value(&self) -> Value {
        Value::Text(self.to_rfc3339())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        let text = String::from_value(value)?;
        serde_json::from_str(&text).map_err(|e| e.to_string())
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => uuid::Uuid::parse_str(&s).map_err(|e| e.to_string()),
            Value::Blob(b) => uuid::Uuid::from_slice(&b).map_err(|e| e.to_string()),
            other => Err(mismatch("TEXT (uuid)", &other)),
        }
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}
